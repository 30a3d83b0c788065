#![allow(dead_code)]

use async_trait::async_trait;
use kintone_bridge::app::App;
use kintone_bridge::normalize::RecordPayload;
use kintone_bridge::services::config::Settings;
use kintone_bridge::services::kintone_client::{
    AppsQuery, KintoneApiError, KintoneErrorBody, Mention, RecordApi, RecordQuery, RecordRef,
    RecordsPage, SharedRecordApi,
};
use kintone_bridge::services::logger::Logger;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// One call that reached the fake API, with the arguments it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    GetRecord { app: u64, id: u64 },
    GetRecords { app: u64, query: Option<String> },
    Create { app: u64, record: Value },
    Update { app: u64, id: u64, record: Value, revision: Option<i64> },
    Comment { app: u64, record: u64, text: String, mentions: Vec<Mention> },
    GetApps { name: Option<String> },
    FormFields { app: u64, lang: Option<String> },
}

/// In-memory stand-in for the kintone REST API.
#[derive(Default)]
pub struct FakeRecordApi {
    calls: StdMutex<Vec<ApiCall>>,
    conflict_on_update: bool,
}

impl FakeRecordApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conflicting() -> Self {
        Self {
            conflict_on_update: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn push(&self, call: ApiCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

fn stored_record(id: u64) -> Value {
    json!({
        "$id": {"type": "__ID__", "value": id.to_string()},
        "$revision": {"type": "__REVISION__", "value": "3"},
        "title": {"type": "SINGLE_LINE_TEXT", "value": "出張"},
        "category": {"type": "DROP_DOWN", "value": "交通費"}
    })
}

#[async_trait]
impl RecordApi for FakeRecordApi {
    async fn get_record(&self, app: u64, id: u64) -> Result<Value, KintoneApiError> {
        self.push(ApiCall::GetRecord { app, id });
        if id == 404 {
            return Err(KintoneApiError::Http {
                status: 404,
                body: KintoneErrorBody {
                    code: Some("GAIA_RE01".to_string()),
                    message: Some("record not found".to_string()),
                    ..KintoneErrorBody::default()
                },
            });
        }
        Ok(stored_record(id))
    }

    async fn get_records(
        &self,
        app: u64,
        query: &RecordQuery,
    ) -> Result<RecordsPage, KintoneApiError> {
        self.push(ApiCall::GetRecords {
            app,
            query: query.query.clone(),
        });
        Ok(RecordsPage {
            records: vec![stored_record(1), stored_record(2)],
            total_count: query.total_count.then_some(2),
        })
    }

    async fn create_record(
        &self,
        app: u64,
        record: &RecordPayload,
    ) -> Result<RecordRef, KintoneApiError> {
        self.push(ApiCall::Create {
            app,
            record: record.to_json(),
        });
        Ok(RecordRef {
            id: "101".to_string(),
            revision: "1".to_string(),
        })
    }

    async fn update_record(
        &self,
        app: u64,
        id: u64,
        record: &RecordPayload,
        revision: Option<i64>,
    ) -> Result<String, KintoneApiError> {
        self.push(ApiCall::Update {
            app,
            id,
            record: record.to_json(),
            revision,
        });
        if self.conflict_on_update {
            return Err(KintoneApiError::Http {
                status: 409,
                body: KintoneErrorBody {
                    code: Some("GAIA_CO02".to_string()),
                    message: Some("revision mismatch".to_string()),
                    ..KintoneErrorBody::default()
                },
            });
        }
        Ok(revision.map(|r| (r + 1).to_string()).unwrap_or_else(|| "4".to_string()))
    }

    async fn add_record_comment(
        &self,
        app: u64,
        record: u64,
        text: &str,
        mentions: &[Mention],
    ) -> Result<String, KintoneApiError> {
        self.push(ApiCall::Comment {
            app,
            record,
            text: text.to_string(),
            mentions: mentions.to_vec(),
        });
        Ok("9".to_string())
    }

    async fn get_apps(&self, query: &AppsQuery) -> Result<Vec<Value>, KintoneApiError> {
        self.push(ApiCall::GetApps {
            name: query.name.clone(),
        });
        Ok(vec![json!({"appId": "7", "name": "経費精算"})])
    }

    async fn get_form_fields(
        &self,
        app: u64,
        lang: Option<&str>,
    ) -> Result<Value, KintoneApiError> {
        self.push(ApiCall::FormFields {
            app,
            lang: lang.map(str::to_string),
        });
        Ok(json!({
            "properties": {
                "category": {"type": "DROP_DOWN", "code": "category", "label": "区分"}
            },
            "revision": "5"
        }))
    }
}

/// An app wired to `api` with default settings.
pub fn app_with(api: Arc<FakeRecordApi>) -> Arc<App> {
    let settings = Settings::from_lookup(|_| None);
    let shared: SharedRecordApi = api;
    Arc::new(App::build(Logger::new("test"), &settings, Ok(shared)).expect("app"))
}

/// Parses the JSON envelope carried in a `tools/call` text content block.
pub fn tool_envelope(result: &Value) -> Value {
    let text = result["content"][0]["text"]
        .as_str()
        .expect("text content");
    serde_json::from_str(text).expect("envelope json")
}
