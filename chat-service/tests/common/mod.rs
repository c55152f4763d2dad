#![allow(dead_code)]

use chat_service::config::{AzureSettings, ChatConfig, GeminiSettings, StorageConfig};
use chat_service::services::ConversationStore;
use chat_service::startup::Application;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use reqwest::Client;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GEMINI_MODEL: &str = "gemini-test";
pub const GEMINI_PATH: &str = "/models/gemini-test:generateContent";
pub const AZURE_PATH: &str = "/score";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: Client,
    pub gemini: MockServer,
    pub azure: MockServer,
    pub store: Arc<ConversationStore>,
    pub config: ChatConfig,
    // Dropped last; the app writes into it until the test ends.
    pub storage: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let storage = TempDir::new().expect("Failed to create storage dir");
        let gemini = MockServer::start().await;
        let azure = MockServer::start().await;

        let config = ChatConfig {
            common: CoreConfig { port: 0 },
            gemini: GeminiSettings {
                api_key: Some(Secret::new("gemini-test-key".to_string())),
                model: GEMINI_MODEL.to_string(),
                api_base: gemini.uri(),
            },
            azure: AzureSettings {
                endpoint: Some(format!("{}{}", azure.uri(), AZURE_PATH)),
                api_key: Some(Secret::new("azure-test-key".to_string())),
            },
            storage: StorageConfig {
                transcript_path: storage.path().join("chat_storage.json"),
                upload_dir: storage.path().join("uploads"),
            },
            provider_timeout_secs: 5,
        };

        let (address, port, store) = start(config.clone()).await;

        TestApp {
            address,
            port,
            client: Client::new(),
            gemini,
            azure,
            store,
            config,
            storage,
        }
    }

    /// Start a second server instance over the same storage, as after a restart.
    pub async fn restart(&self) -> String {
        let (address, _, _) = start(self.config.clone()).await;
        address
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.config.storage.transcript_path.clone()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.config.storage.upload_dir.clone()
    }

    pub async fn new_chat(&self) -> String {
        let body: Value = self
            .client
            .post(format!("{}/new_chat", self.address))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .expect("Failed to parse new_chat response");

        body["chatId"]
            .as_str()
            .expect("chatId missing")
            .to_string()
    }

    pub async fn post_chat(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn history(&self) -> Value {
        history_at(&self.client, &self.address).await
    }

    pub async fn upload(
        &self,
        chat_id: Option<&str>,
        filename: &str,
        bytes: Vec<u8>,
    ) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(chat_id) = chat_id {
            form = form.text("chatId", chat_id.to_string());
        }

        self.client
            .post(format!("{}/upload", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn mount_gemini_reply(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(GEMINI_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": text }] }
                }]
            })))
            .mount(&self.gemini)
            .await;
    }

    pub async fn mount_azure_body(&self, body: Value) {
        Mock::given(method("POST"))
            .and(path(AZURE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.azure)
            .await;
    }
}

pub async fn history_at(client: &Client, address: &str) -> Value {
    client
        .get(format!("{}/get_chat_history", address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse history")
}

async fn start(config: ChatConfig) -> (String, u16, Arc<ConversationStore>) {
    let app = Application::build(config)
        .await
        .expect("Failed to build test application");

    let port = app.port();
    let store = app.store().clone();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let client = Client::new();
    let health_url = format!("{}/health", address);
    for _ in 0..50 {
        if client.get(&health_url).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    (address, port, store)
}

/// A minimal PDF with one line of text per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("Failed to encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to write PDF");
    bytes
}
