//! HTTP client for a GraphRAG engine server

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{EngineAnswer, EngineError, EngineRequest, SearchEngine};
use crate::context::ContextValue;

/// Engine reached over HTTP at `{endpoint}/search/{method}`
pub struct RemoteEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct RemoteSearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    community_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_community_selection: Option<bool>,
}

#[derive(Deserialize)]
struct RemoteSearchResponse {
    response: Value,
    #[serde(default)]
    context_data: Value,
}

impl RemoteEngine {
    /// Create a new engine client
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn search(&self, method: &str, body: &RemoteSearchRequest<'_>) -> Result<EngineAnswer, EngineError> {
        let url = format!("{}/search/{}", self.endpoint, method);

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| EngineError::Request {
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status { status, body });
        }

        let result: RemoteSearchResponse = response.json().await.map_err(|e| {
            EngineError::InvalidResponse {
                message: e.to_string(),
            }
        })?;

        // Engines answer with either plain text or a structured document
        let response = match result.response {
            Value::String(text) => text,
            Value::Null => {
                return Err(EngineError::InvalidResponse {
                    message: "missing response".to_string(),
                })
            }
            other => serde_json::to_string_pretty(&other).map_err(|e| {
                EngineError::InvalidResponse {
                    message: e.to_string(),
                }
            })?,
        };

        Ok(EngineAnswer {
            response,
            context: ContextValue::from(result.context_data),
        })
    }

    fn request<'a>(request: &EngineRequest<'a>) -> RemoteSearchRequest<'a> {
        RemoteSearchRequest {
            query: request.query,
            community_level: Some(request.community_level),
            response_type: Some(request.response_type),
            dynamic_community_selection: None,
        }
    }
}

#[async_trait]
impl SearchEngine for RemoteEngine {
    async fn global_search(
        &self,
        request: &EngineRequest<'_>,
        dynamic_community_selection: bool,
    ) -> Result<EngineAnswer, EngineError> {
        let body = RemoteSearchRequest {
            dynamic_community_selection: Some(dynamic_community_selection),
            ..Self::request(request)
        };
        self.search("global", &body).await
    }

    async fn local_search(&self, request: &EngineRequest<'_>) -> Result<EngineAnswer, EngineError> {
        self.search("local", &Self::request(request)).await
    }

    async fn drift_search(&self, request: &EngineRequest<'_>) -> Result<EngineAnswer, EngineError> {
        self.search("drift", &Self::request(request)).await
    }

    async fn basic_search(&self, request: &EngineRequest<'_>) -> Result<EngineAnswer, EngineError> {
        let body = RemoteSearchRequest {
            query: request.query,
            community_level: None,
            response_type: None,
            dynamic_community_selection: None,
        };
        self.search("basic", &body).await
    }

    fn name(&self) -> &str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Datasets, ProjectSettings};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn engine_request<'a>(settings: &'a ProjectSettings, datasets: &'a Datasets) -> EngineRequest<'a> {
        EngineRequest {
            settings,
            datasets,
            community_level: 2,
            response_type: "Single Sentence",
            query: "who is alice?",
        }
    }

    #[tokio::test]
    async fn test_global_search_round_trip() {
        let app = Router::new().route(
            "/search/global",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "response": format!("level {}", body["community_level"]),
                    "context_data": {
                        "echo": body,
                        "reports": [{"id": "7", "title": "Alice and Bob"}]
                    }
                }))
            }),
        );
        let endpoint = serve(app).await;
        let engine = RemoteEngine::new(&endpoint, None, Duration::from_secs(5)).unwrap();

        let settings = ProjectSettings::new(".", Value::Null);
        let datasets = Datasets::default();
        let answer = engine
            .global_search(&engine_request(&settings, &datasets), false)
            .await
            .unwrap();

        assert_eq!(answer.response, "level 2");
        let context = crate::context::normalize(answer.context);
        assert_eq!(context["echo"]["dynamic_community_selection"], json!(false));
        assert_eq!(context["echo"]["response_type"], json!("Single Sentence"));
        assert_eq!(context["reports"][0]["title"], json!("Alice and Bob"));
    }

    #[tokio::test]
    async fn test_basic_search_sends_query_only() {
        let app = Router::new().route(
            "/search/basic",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "response": body.to_string() }))
            }),
        );
        let endpoint = serve(app).await;
        let engine = RemoteEngine::new(&format!("{}/", endpoint), None, Duration::from_secs(5)).unwrap();

        let settings = ProjectSettings::new(".", Value::Null);
        let datasets = Datasets::default();
        let answer = engine
            .basic_search(&engine_request(&settings, &datasets))
            .await
            .unwrap();

        assert_eq!(answer.response, r#"{"query":"who is alice?"}"#);
        assert_eq!(answer.context, ContextValue::Scalar(Value::Null));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let app = Router::new().route(
            "/search/local",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "index not found") }),
        );
        let endpoint = serve(app).await;
        let engine = RemoteEngine::new(&endpoint, None, Duration::from_secs(5)).unwrap();

        let settings = ProjectSettings::new(".", Value::Null);
        let datasets = Datasets::default();
        let err = engine
            .local_search(&engine_request(&settings, &datasets))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Status { status: 500, ref body } if body == "index not found"));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let app = Router::new().route("/search/drift", post(|| async { "not json" }));
        let endpoint = serve(app).await;
        let engine = RemoteEngine::new(&endpoint, None, Duration::from_secs(5)).unwrap();

        let settings = ProjectSettings::new(".", Value::Null);
        let datasets = Datasets::default();
        let err = engine
            .drift_search(&engine_request(&settings, &datasets))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidResponse { .. }));
    }
}
