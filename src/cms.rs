use crate::config::CmsConfig;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Failures talking to the CMS pages API.
#[derive(Debug, Error)]
pub enum CmsError {
    #[error("Failed to fetch page ({status}): {body}")]
    Fetch { status: StatusCode, body: String },

    #[error("Bad request: the payload was rejected ({})", .messages.join("; "))]
    Rejected { messages: Vec<String> },

    #[error("Unauthorized: check HUBSPOT_API_KEY")]
    Unauthorized,

    #[error("Page not found: check PAGE_ID (current: {page_id})")]
    NotFound { page_id: String },

    #[error("Unexpected response ({status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloneRequest<'a> {
    id: &'a str,
    clone_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CloneResponse {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the site-pages endpoints of the CMS.
pub struct CmsClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl CmsClient {
    pub fn new(client: reqwest::Client, config: &CmsConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn page_url(&self, page_id: &str) -> String {
        format!("{}/cms/v3/pages/site-pages/{}", self.api_url, page_id)
    }

    fn clone_url(&self) -> String {
        format!("{}/cms/v3/pages/site-pages/clone", self.api_url)
    }

    /// GET a page. Anything but 200 is a fetch failure.
    pub async fn fetch_page(&self, page_id: &str) -> Result<Value, CmsError> {
        let response = self
            .client
            .get(self.page_url(page_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CmsError::Fetch { status, body });
        }

        let page: Value = response.json().await?;
        info!(
            "✓ Page fetched successfully (ID: {})",
            page.get("id").map(display_id).unwrap_or_else(|| page_id.to_string())
        );
        Ok(page)
    }

    /// PATCH a page with a prepared payload and return the updated page.
    pub async fn patch_page(&self, page_id: &str, payload: &Value) -> Result<Value, CmsError> {
        let response = self
            .client
            .patch(self.page_url(page_id))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::NO_CONTENT => Ok(Value::Null),
            status => Err(error_for(status, page_id, response.text().await.unwrap_or_default())),
        }
    }

    /// Clone a page under a new name and return the new page id.
    pub async fn clone_page(&self, page_id: &str, clone_name: &str) -> Result<String, CmsError> {
        debug!("POST {}", self.clone_url());
        let response = self
            .client
            .post(self.clone_url())
            .bearer_auth(&self.api_key)
            .json(&CloneRequest {
                id: page_id,
                clone_name,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let cloned: CloneResponse = response.json().await?;
                Ok(display_id(&cloned.id))
            }
            status => Err(error_for(status, page_id, response.text().await.unwrap_or_default())),
        }
    }
}

/// Ids come back as strings or numbers depending on the endpoint.
fn display_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn error_for(status: StatusCode, page_id: &str, body: String) -> CmsError {
    match status {
        StatusCode::BAD_REQUEST => CmsError::Rejected {
            messages: error_messages(&body),
        },
        StatusCode::UNAUTHORIZED => CmsError::Unauthorized,
        StatusCode::NOT_FOUND => CmsError::NotFound {
            page_id: page_id.to_string(),
        },
        _ => CmsError::Status { status, body },
    }
}

/// Field-level messages from a 400 body, falling back to the raw body.
fn error_messages(body: &str) -> Vec<String> {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| e.message.unwrap_or_else(|| "Unknown error".to_string()))
            .collect(),
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => vec![message],
        _ => vec![body.to_string()],
    }
}
