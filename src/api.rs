use crate::devices::Device;
use crate::form::QueryForm;
use crate::table::Record;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_FILENAME: &str = "air_quality_data.csv";

lazy_static! {
    static ref FILENAME_PATTERN: Regex =
        Regex::new(r#"filename="(.+)""#).expect("filename pattern compiles");
}

/// Failure of a single backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No usable response: connection failure or an unreadable body.
    #[error("network error: {0}")]
    Network(String),
    /// The backend answered but reported a failure.
    #[error("rejected by backend: {}", .0.as_deref().unwrap_or("no detail"))]
    Rejected(Option<String>),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub works: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewData {
    pub records: Vec<Record>,
    pub total_records: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    /// Content type reported by the backend, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<Device>, ApiError>;
    async fn test_device(&self, mac: &str) -> Result<TestReport, ApiError>;
    async fn save_device(&self, mac: &str, name: Option<&str>) -> Result<(), ApiError>;
    async fn remove_device(&self, mac: &str) -> Result<(), ApiError>;
    async fn preview(&self, form: &QueryForm) -> Result<PreviewData, ApiError>;
    async fn download(&self, form: &QueryForm) -> Result<Download, ApiError>;
}

/// `filename="..."` from a Content-Disposition header, else [`DEFAULT_FILENAME`].
pub fn filename_from_disposition(header: Option<&str>) -> String {
    header
        .and_then(|value| FILENAME_PATTERN.captures(value))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

#[derive(Deserialize)]
struct TestReply {
    #[serde(default)]
    works: bool,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ActionReply {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct PreviewReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<Record>,
    total_records: Option<u64>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: Option<String>,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_action(&self, path: &str, form: &[(&str, &str)]) -> Result<(), ApiError> {
        let reply: ActionReply = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await?
            .json()
            .await?;
        if reply.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(reply.error))
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_devices(&self) -> Result<Vec<Device>, ApiError> {
        let body: Value = self
            .client
            .get(self.url("/api/devices"))
            .send()
            .await?
            .json()
            .await?;
        match body {
            Value::Array(_) => serde_json::from_value(body)
                .map_err(|err| ApiError::Network(format!("malformed device list: {err}"))),
            other => Err(ApiError::Rejected(
                other
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            )),
        }
    }

    async fn test_device(&self, mac: &str) -> Result<TestReport, ApiError> {
        let reply: TestReply = self
            .client
            .post(self.url("/api/devices/test"))
            .form(&[("mac", mac)])
            .send()
            .await?
            .json()
            .await?;
        Ok(TestReport {
            works: reply.works,
            message: reply.message.or(reply.error).unwrap_or_default(),
        })
    }

    async fn save_device(&self, mac: &str, name: Option<&str>) -> Result<(), ApiError> {
        let mut form = vec![("mac", mac)];
        if let Some(name) = name {
            form.push(("name", name));
        }
        self.post_action("/api/devices/save", &form).await
    }

    async fn remove_device(&self, mac: &str) -> Result<(), ApiError> {
        self.post_action("/api/devices/remove", &[("mac", mac)]).await
    }

    async fn preview(&self, form: &QueryForm) -> Result<PreviewData, ApiError> {
        let reply: PreviewReply = self
            .client
            .post(self.url("/preview_data"))
            .form(&form.to_pairs())
            .send()
            .await?
            .json()
            .await?;
        if !reply.success {
            return Err(ApiError::Rejected(reply.error));
        }
        let total_records = reply.total_records.unwrap_or(reply.data.len() as u64);
        Ok(PreviewData {
            records: reply.data,
            total_records,
        })
    }

    async fn download(&self, form: &QueryForm) -> Result<Download, ApiError> {
        let response = self
            .client
            .post(self.url("/download_data"))
            .form(&form.to_pairs())
            .send()
            .await?;
        if !response.status().is_success() {
            let reply: ErrorReply = response.json().await?;
            return Err(ApiError::Rejected(reply.error));
        }
        let filename = filename_from_disposition(
            response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
        );
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        Ok(Download {
            filename,
            content_type,
            bytes,
        })
    }
}
