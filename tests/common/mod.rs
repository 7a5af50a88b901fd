#![allow(dead_code)]

use ndarray::Array1;
use std::sync::Arc;
use tokio::net::TcpListener;

use topiclass::{
    server, CategoryTable, EncodedInput, ModelHost, PredictionError, SequenceClassifier,
    TextEncoder,
};

pub const CATEGORIES: [&str; 5] = ["Science", "Sports", "Business", "Politics", "Entertainment"];

const KEYWORDS: [&[&str]; 5] = [
    &["space", "exploration", "rocket", "physics", "research"],
    &["match", "goal", "team", "championship", "league"],
    &["stock", "market", "earnings", "company", "startup"],
    &["election", "senate", "policy", "minister", "vote"],
    &["movie", "premiere", "celebrity", "album", "concert"],
];

/// Encodes text as its UTF-8 bytes, one token per byte.
pub struct ByteEncoder;

impl TextEncoder for ByteEncoder {
    fn encode(&self, text: &str) -> Result<EncodedInput, PredictionError> {
        let ids: Vec<u32> = text.bytes().map(u32::from).collect();
        Ok(EncodedInput::from_ids(&ids))
    }
}

/// Always fails, as a tokenizer fed something it cannot handle would.
pub struct FailingEncoder;

impl TextEncoder for FailingEncoder {
    fn encode(&self, _text: &str) -> Result<EncodedInput, PredictionError> {
        Err(PredictionError::Tokenization("injected tokenizer fault".into()))
    }
}

/// Panics inside the pipeline, as a misbehaving third-party library might.
pub struct PanickingEncoder;

impl TextEncoder for PanickingEncoder {
    fn encode(&self, _text: &str) -> Result<EncodedInput, PredictionError> {
        panic!("injected tokenizer panic");
    }
}

/// Scores each category by how many of its keywords appear in the decoded
/// bytes. Deterministic, and never produces exact ties between categories.
pub struct KeywordClassifier {
    pub declared_width: Option<usize>,
}

impl SequenceClassifier for KeywordClassifier {
    fn num_labels(&self) -> Option<usize> {
        self.declared_width
    }

    fn infer(&self, input: &EncodedInput) -> Result<Array1<f32>, PredictionError> {
        let bytes: Vec<u8> = input.input_ids.iter().map(|&id| id as u8).collect();
        let text = String::from_utf8_lossy(&bytes).to_lowercase();
        Ok(KEYWORDS
            .iter()
            .enumerate()
            .map(|(i, words)| {
                let hits = words.iter().filter(|w| text.contains(*w)).count() as f32;
                2.0 * hits - 0.1 * i as f32
            })
            .collect())
    }
}

pub fn categories() -> CategoryTable {
    CategoryTable::new(CATEGORIES.to_vec()).unwrap()
}

pub fn keyword_host() -> ModelHost {
    host_with_encoder(ByteEncoder)
}

pub fn host_with_encoder(encoder: impl TextEncoder + 'static) -> ModelHost {
    let classifier = KeywordClassifier {
        declared_width: Some(5),
    };
    ModelHost::from_parts(encoder, classifier, categories()).unwrap()
}

/// Serves `host` on an ephemeral local port and returns the base URL.
pub async fn spawn_server(host: ModelHost) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(Arc::new(host));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
