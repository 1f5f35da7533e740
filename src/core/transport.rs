use crate::core::{ConfigProvider, DispatchReceipt, Record, Transport};
use crate::utils::error::{MapperError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/process-data";

/// POST the whole record array as one JSON body.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
    headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: None,
            headers: Vec::new(),
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        let mut transport = Self::new(config.api_endpoint());
        transport.timeout = config.timeout_seconds().map(Duration::from_secs);
        transport.headers = config.request_headers();
        transport
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, records: &[Record]) -> Result<DispatchReceipt> {
        if records.is_empty() {
            return Err(MapperError::NoDataError);
        }

        // 請求內容在送出前就序列化完成，之後修改表格不會影響這次請求
        let body = serde_json::to_vec(records)?;

        tracing::info!(
            "📤 Sending {} records ({} bytes) to {}",
            records.len(),
            body.len(),
            self.endpoint
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json");

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(MapperError::HttpStatusError {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        tracing::debug!("Response from backend: {}", body);

        Ok(DispatchReceipt {
            status: status.as_u16(),
            body,
            timestamp: chrono::Utc::now(),
            record_count: records.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn record(name: &str, qty: &str) -> Record {
        let mut record = Record::new();
        record.insert("name", name);
        record.insert("qty", qty);
        record
    }

    #[tokio::test]
    async fn test_send_posts_json_array() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/process-data")
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    {"name": "Widget", "qty": "10"},
                    {"name": "Gadget", "qty": "4"}
                ]));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"success": true}));
        });

        let transport = HttpTransport::new(server.url("/api/process-data"));
        let receipt = transport
            .send(&[record("Widget", "10"), record("Gadget", "4")])
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(receipt.status, 200);
        assert_eq!(receipt.record_count, 2);
        assert_eq!(receipt.body["success"], true);
    }

    #[tokio::test]
    async fn test_send_non_success_status() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/api/process-data");
            then.status(400)
                .json_body(serde_json::json!({"success": false}));
        });

        let transport = HttpTransport::new(server.url("/api/process-data"));
        let err = transport.send(&[record("Widget", "10")]).await.unwrap_err();

        api_mock.assert();
        match err {
            MapperError::HttpStatusError {
                status,
                status_text,
            } => {
                assert_eq!(status, 400);
                assert_eq!(status_text, "Bad Request");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_empty_records_skips_network() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/api/process-data");
            then.status(200).json_body(serde_json::json!({}));
        });

        let transport = HttpTransport::new(server.url("/api/process-data"));
        let err = transport.send(&[]).await.unwrap_err();

        assert!(matches!(err, MapperError::NoDataError));
        assert_eq!(api_mock.hits(), 0);
    }

    #[tokio::test]
    async fn test_send_extra_headers() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/ingest")
                .header("Authorization", "Bearer token-123");
            then.status(201).json_body(serde_json::json!({"id": 7}));
        });

        let transport = HttpTransport::new(server.url("/ingest"))
            .with_header("Authorization", "Bearer token-123")
            .with_timeout(Duration::from_secs(5));
        let receipt = transport.send(&[record("Widget", "10")]).await.unwrap();

        api_mock.assert();
        assert_eq!(receipt.status, 201);
        assert_eq!(receipt.body["id"], 7);
    }
}
