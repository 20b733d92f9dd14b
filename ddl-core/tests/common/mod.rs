#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use ddl_core::{AppConfig, Deliver, DeliveryError, Engine};
use serde_json::{json, Value};

/// Records every delivery; fails for one chosen recipient if asked to.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
    fail_for: Mutex<Option<String>>,
}

impl RecordingSink {
    pub fn failing_for(recipient: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: Mutex::new(Some(recipient.to_string())),
        }
    }

    /// Lets deliveries to the failing recipient succeed from now on.
    pub fn recover(&self) {
        *self.fail_for.lock().unwrap() = None;
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(r, _)| r == recipient)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Deliver for RecordingSink {
    async fn deliver(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        if self.fail_for.lock().unwrap().as_deref() == Some(recipient) {
            return Err(DeliveryError::Unavailable("test sink offline".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

pub fn program(name: &str, deadline: Option<String>, tags: &[&str]) -> Value {
    json!({
        "name": name,
        "institute": "School of Computer Science",
        "description": format!("{name} summer camp"),
        "deadline": deadline,
        "website": format!("https://{}.example.edu", name.to_lowercase()),
        "tags": tags,
    })
}

/// Deadline `days` from now, as an offset-aware timestamp.
pub fn in_days(days: i64) -> Option<String> {
    Some((Utc::now() + Duration::days(days)).to_rfc3339())
}

pub fn document(sources: &[(&str, Vec<Value>)]) -> String {
    let mut map = serde_json::Map::new();
    for (name, programs) in sources {
        map.insert(name.to_string(), Value::Array(programs.clone()));
    }
    Value::Object(map).to_string()
}

pub fn config_for(url: &str) -> AppConfig {
    AppConfig {
        remote_url: url.to_string(),
        ..AppConfig::default()
    }
}

pub fn engine_with(sink: Arc<RecordingSink>) -> Engine {
    Engine::in_memory(
        config_for("http://127.0.0.1:9/unreachable.json"),
        reqwest::Client::new(),
        sink,
    )
}

pub async fn seed(engine: &Engine, json: &str) {
    let document = ddl_core::CatalogDocument::from_slice(json.as_bytes()).unwrap();
    engine.replace_catalog(document).await;
}
