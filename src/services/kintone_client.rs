use crate::constants::kintone::{
    APPS_PATH, FORM_FIELDS_PATH, HEADER_API_TOKEN, HEADER_AUTHORIZATION, RECORDS_PATH,
    RECORD_COMMENT_PATH, RECORD_PATH, REVISION_CONFLICT_CODE,
};
use crate::constants::network::{TIMEOUT_CONNECTION_MS, USER_AGENT};
use crate::constants::retry::STATUS_CODES as RETRY_STATUS_CODES;
use crate::errors::ToolError;
use crate::normalize::RecordPayload;
use crate::services::config::{KintoneAuth, KintoneConfig};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The body kintone sends with a failed request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct KintoneErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum KintoneApiError {
    #[error("kintone request timed out")]
    Timeout,
    #[error("kintone request failed: {0}")]
    Transport(String),
    #[error("kintone returned HTTP {status}: {}", .body.message.as_deref().unwrap_or("no message"))]
    Http { status: u16, body: KintoneErrorBody },
    #[error("kintone returned an unexpected response: {0}")]
    InvalidResponse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl KintoneApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            KintoneApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn kintone_code(&self) -> Option<&str> {
        match self {
            KintoneApiError::Http { body, .. } => body.code.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for KintoneApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return KintoneApiError::Timeout;
        }
        if err.is_decode() {
            return KintoneApiError::InvalidResponse(err.to_string());
        }
        KintoneApiError::Transport(err.to_string())
    }
}

impl From<KintoneApiError> for ToolError {
    fn from(err: KintoneApiError) -> Self {
        let message = err.to_string();
        match &err {
            KintoneApiError::Timeout => ToolError::timeout(message),
            KintoneApiError::Transport(_) => ToolError::retryable(message),
            KintoneApiError::InvalidResponse(_) => ToolError::internal(message),
            KintoneApiError::InvalidRequest(_) => ToolError::invalid_params(message),
            KintoneApiError::Http { status, body } => {
                let conflict =
                    body.code.as_deref() == Some(REVISION_CONFLICT_CODE) || *status == 409;
                let base = if conflict {
                    ToolError::conflict(message).with_hint(
                        "The record changed since it was read. Fetch it again or pass revision -1.",
                    )
                } else {
                    match *status {
                        401 | 403 => ToolError::denied(message)
                            .with_hint("Check the API token or user permissions for this app."),
                        404 => ToolError::not_found(message),
                        400 | 422 => ToolError::invalid_params(message),
                        s if RETRY_STATUS_CODES.contains(&s) => ToolError::retryable(message),
                        _ => ToolError::internal(message),
                    }
                };
                base.with_details(json!({
                    "status": status,
                    "kintone_code": body.code,
                    "kintone_id": body.id,
                    "errors": body.errors,
                }))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecordRef {
    pub id: String,
    pub revision: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordsPage {
    pub records: Vec<Value>,
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub query: Option<String>,
    pub fields: Option<Vec<String>>,
    pub total_count: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppsQuery {
    pub name: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// `{ "type": "USER" | "GROUP" | "ORGANIZATION", "code": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Mention {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
}

/// The remote calls the tools need, one method per REST endpoint.
#[async_trait]
pub trait RecordApi: Send + Sync {
    async fn get_record(&self, app: u64, id: u64) -> Result<Value, KintoneApiError>;

    async fn get_records(
        &self,
        app: u64,
        query: &RecordQuery,
    ) -> Result<RecordsPage, KintoneApiError>;

    async fn create_record(
        &self,
        app: u64,
        record: &RecordPayload,
    ) -> Result<RecordRef, KintoneApiError>;

    /// Returns the new revision.
    async fn update_record(
        &self,
        app: u64,
        id: u64,
        record: &RecordPayload,
        revision: Option<i64>,
    ) -> Result<String, KintoneApiError>;

    /// Returns the comment id.
    async fn add_record_comment(
        &self,
        app: u64,
        record: u64,
        text: &str,
        mentions: &[Mention],
    ) -> Result<String, KintoneApiError>;

    async fn get_apps(&self, query: &AppsQuery) -> Result<Vec<Value>, KintoneApiError>;

    async fn get_form_fields(&self, app: u64, lang: Option<&str>)
        -> Result<Value, KintoneApiError>;
}

pub type SharedRecordApi = Arc<dyn RecordApi>;

pub struct KintoneClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl KintoneClient {
    pub fn new(config: &KintoneConfig) -> Result<Self, KintoneApiError> {
        let base_url = Url::parse(&config.base_url())
            .map_err(|err| KintoneApiError::InvalidRequest(err.to_string()))?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(auth_headers(&config.auth)?)
            .connect_timeout(Duration::from_millis(TIMEOUT_CONNECTION_MS))
            .build()?;
        Ok(Self {
            http,
            base_url,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, params: &[(String, String)]) -> Result<Url, KintoneApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| KintoneApiError::InvalidRequest(err.to_string()))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, KintoneApiError> {
        let url = self.endpoint(path, params)?;
        let mut req = self.http.request(method, url).timeout(self.timeout);
        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json").json(&body);
        }
        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let body = serde_json::from_str::<KintoneErrorBody>(&text).unwrap_or_else(|_| {
                KintoneErrorBody {
                    message: Some(text.chars().take(200).collect()),
                    ..Default::default()
                }
            });
            return Err(KintoneApiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&text).map_err(|err| KintoneApiError::InvalidResponse(err.to_string()))
    }
}

fn auth_headers(auth: &KintoneAuth) -> Result<HeaderMap, KintoneApiError> {
    let (name, raw) = match auth {
        KintoneAuth::ApiToken(token) => (HEADER_API_TOKEN, token.clone()),
        KintoneAuth::Password { username, password } => (
            HEADER_AUTHORIZATION,
            base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password)),
        ),
    };
    let header = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| KintoneApiError::InvalidRequest(err.to_string()))?;
    let mut value = HeaderValue::from_str(&raw).map_err(|_| {
        KintoneApiError::InvalidRequest(format!(
            "{} contains characters not allowed in a header",
            name
        ))
    })?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(header, value);
    Ok(headers)
}

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value, KintoneApiError> {
    value
        .get(key)
        .ok_or_else(|| KintoneApiError::InvalidResponse(format!("missing `{}`", key)))
}

/// kintone encodes ids and revisions as strings; accept numbers as well.
fn string_field(value: &Value, key: &str) -> Result<String, KintoneApiError> {
    match field(value, key)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(KintoneApiError::InvalidResponse(format!(
            "`{}` is not a string: {}",
            key, other
        ))),
    }
}

pub(crate) fn parse_records_page(value: Value) -> Result<RecordsPage, KintoneApiError> {
    let records = field(&value, "records")?
        .as_array()
        .cloned()
        .ok_or_else(|| KintoneApiError::InvalidResponse("`records` is not an array".into()))?;
    let total_count = match value.get("totalCount") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => s.parse::<u64>().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        Some(_) => None,
    };
    Ok(RecordsPage {
        records,
        total_count,
    })
}

fn records_params(app: u64, query: &RecordQuery) -> Vec<(String, String)> {
    let mut params = vec![("app".to_string(), app.to_string())];
    if let Some(q) = query.query.as_ref().filter(|q| !q.trim().is_empty()) {
        params.push(("query".to_string(), q.clone()));
    }
    if let Some(fields) = &query.fields {
        params.extend(
            fields
                .iter()
                .enumerate()
                .map(|(idx, code)| (format!("fields[{}]", idx), code.clone())),
        );
    }
    if query.total_count {
        params.push(("totalCount".to_string(), "true".to_string()));
    }
    params
}

#[async_trait]
impl RecordApi for KintoneClient {
    async fn get_record(&self, app: u64, id: u64) -> Result<Value, KintoneApiError> {
        let params = [
            ("app".to_string(), app.to_string()),
            ("id".to_string(), id.to_string()),
        ];
        let body = self.send(Method::GET, RECORD_PATH, &params, None).await?;
        Ok(field(&body, "record")?.clone())
    }

    async fn get_records(
        &self,
        app: u64,
        query: &RecordQuery,
    ) -> Result<RecordsPage, KintoneApiError> {
        let params = records_params(app, query);
        let body = self.send(Method::GET, RECORDS_PATH, &params, None).await?;
        parse_records_page(body)
    }

    async fn create_record(
        &self,
        app: u64,
        record: &RecordPayload,
    ) -> Result<RecordRef, KintoneApiError> {
        let body = json!({"app": app, "record": record.to_json()});
        let response = self.send(Method::POST, RECORD_PATH, &[], Some(body)).await?;
        Ok(RecordRef {
            id: string_field(&response, "id")?,
            revision: string_field(&response, "revision")?,
        })
    }

    async fn update_record(
        &self,
        app: u64,
        id: u64,
        record: &RecordPayload,
        revision: Option<i64>,
    ) -> Result<String, KintoneApiError> {
        let mut body = json!({"app": app, "id": id, "record": record.to_json()});
        if let Some(revision) = revision {
            body["revision"] = json!(revision);
        }
        let response = self.send(Method::PUT, RECORD_PATH, &[], Some(body)).await?;
        string_field(&response, "revision")
    }

    async fn add_record_comment(
        &self,
        app: u64,
        record: u64,
        text: &str,
        mentions: &[Mention],
    ) -> Result<String, KintoneApiError> {
        let body = json!({
            "app": app,
            "record": record,
            "comment": {"text": text, "mentions": mentions},
        });
        let response = self
            .send(Method::POST, RECORD_COMMENT_PATH, &[], Some(body))
            .await?;
        string_field(&response, "id")
    }

    async fn get_apps(&self, query: &AppsQuery) -> Result<Vec<Value>, KintoneApiError> {
        let mut params = Vec::new();
        if let Some(name) = &query.name {
            params.push(("name".to_string(), name.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = query.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        let body = self.send(Method::GET, APPS_PATH, &params, None).await?;
        field(&body, "apps")?
            .as_array()
            .cloned()
            .ok_or_else(|| KintoneApiError::InvalidResponse("`apps` is not an array".into()))
    }

    async fn get_form_fields(
        &self,
        app: u64,
        lang: Option<&str>,
    ) -> Result<Value, KintoneApiError> {
        let mut params = vec![("app".to_string(), app.to_string())];
        if let Some(lang) = lang {
            params.push(("lang".to_string(), lang.to_string()));
        }
        self.send(Method::GET, FORM_FIELDS_PATH, &params, None).await
    }
}
