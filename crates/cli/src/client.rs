//! API client for communicating with the prediction server

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

const TEACHER_HEADER: &str = "x-teacher-id";
const ADMIN_HEADER: &str = "x-admin";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to reach API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

/// Identity sent with each request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Teacher(i64),
    Admin,
    Anonymous,
}

/// API client for the prediction server
pub struct ApiClient {
    client: Client,
    base_url: Url,
    principal: Principal,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, principal: Principal) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        // Relative joins keep any path prefix only with a trailing slash
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            client,
            base_url,
            principal,
        })
    }

    pub async fn predict(&self, student_id: i64) -> Result<PredictResponse, ClientError> {
        let url = self.url(&format!("students/{}/predict", student_id))?;
        self.send(self.client.post(url), &[StatusCode::OK]).await
    }

    pub async fn predict_all(&self) -> Result<PredictAllResponse, ClientError> {
        let url = self.url("students/predict_all")?;
        self.send(self.client.post(url), &[StatusCode::OK]).await
    }

    pub async fn stats(&self) -> Result<StatsResponse, ClientError> {
        let url = self.url("api/stats")?;
        self.send(self.client.get(url), &[StatusCode::OK]).await
    }

    /// Fetch the health report; an unhealthy server still answers with a body
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.url("healthz")?;
        self.send(
            self.client.get(url),
            &[StatusCode::OK, StatusCode::SERVICE_UNAVAILABLE],
        )
        .await
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        accepted: &[StatusCode],
    ) -> Result<T, ClientError> {
        let request = match self.principal {
            Principal::Teacher(id) => request.header(TEACHER_HEADER, id.to_string()),
            Principal::Admin => request.header(ADMIN_HEADER, "true"),
            Principal::Anonymous => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if !accepted.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ClientError::Api { status, message });
        }

        Ok(response.json().await?)
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPrediction {
    pub id: i64,
    pub prediction: String,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictAllResponse {
    pub updated: usize,
    pub skipped: usize,
    #[serde(default)]
    pub students: Vec<StudentPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total: usize,
    pub passes: usize,
    pub fails: usize,
    pub avg_prob_pass: f64,
    pub avg_prob_fail: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
