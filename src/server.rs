// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// HTTP surface: fill-cell, compare-results and assess-complexity

use anyhow::{Context, Result};
use axum::{
	extract::{rejection::JsonRejection, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
	Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::complexity::{Complexity, ComplexityClassifier};
use crate::compare::ResultComparator;
use crate::config::Config;
use crate::errors::CellError;
use crate::gateway::{Gateway, GenerationRequest, GenerationResult, ModelSelection};
use crate::providers::ModelBackend;
use crate::{log_error, log_info};

pub struct AppState {
	gateway: Gateway,
	classifier: ComplexityClassifier,
	comparator: ResultComparator,
}

impl AppState {
	pub fn new(backend: Arc<dyn ModelBackend>, config: &Config) -> Self {
		Self {
			gateway: Gateway::new(backend.clone(), config),
			classifier: ComplexityClassifier::new(backend.clone(), config),
			comparator: ResultComparator::new(backend, config),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillCellRequest {
	#[serde(default)]
	pub prompt: String,
	#[serde(default)]
	pub context: BTreeMap<String, String>,
	#[serde(default)]
	pub column_key: String,
	#[serde(default)]
	pub row_data: BTreeMap<String, String>,
	#[serde(default)]
	pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareRequest {
	#[serde(default)]
	pub result1: String,
	#[serde(default)]
	pub result2: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CompareResponse {
	#[serde(rename = "match")]
	pub matched: bool,
	pub confidence: u8,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub success: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssessRequest {
	#[serde(default)]
	pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AssessResponse {
	pub complexity: Complexity,
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

fn status(error: &CellError) -> StatusCode {
	StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn router(state: Arc<AppState>) -> Router {
	let api = Router::new()
		.route("/fill-cell", post(fill_cell))
		.route("/compare-results", post(compare_results))
		.route("/assess-complexity", post(assess_complexity));

	Router::new()
		.route("/health", get(health))
		.merge(api.clone())
		.nest("/api", api)
		.with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
	Json(serde_json::json!({
		"status": "ok",
		"configured": state.gateway.backend().is_configured(),
	}))
}

async fn fill_cell(
	State(state): State<Arc<AppState>>,
	body: Result<Json<FillCellRequest>, JsonRejection>,
) -> Response {
	let body = match body {
		Ok(Json(body)) => body,
		Err(rejection) => {
			let error = format!("Invalid request body: {}", rejection.body_text());
			return (StatusCode::BAD_REQUEST, Json(GenerationResult::failure(error))).into_response();
		}
	};

	let request = GenerationRequest {
		prompt: body.prompt,
		context: body.context,
		column_key: body.column_key,
		row_data: body.row_data,
		model: ModelSelection::parse(body.model.as_deref()),
	};

	match state.gateway.generate(&request).await {
		Ok(outcome) => Json(GenerationResult::from(&outcome)).into_response(),
		Err(e) => {
			log_error!("fill-cell failed: {}", e.detail());
			(status(&e), Json(GenerationResult::failure(e.to_string()))).into_response()
		}
	}
}

async fn compare_results(
	State(state): State<Arc<AppState>>,
	Json(body): Json<CompareRequest>,
) -> Response {
	match state.comparator.compare(&body.result1, &body.result2).await {
		Ok(comparison) => Json(CompareResponse {
			matched: comparison.matched,
			confidence: comparison.confidence,
			success: None,
			error: None,
		})
		.into_response(),
		Err(CellError::Configuration) => (
			StatusCode::INTERNAL_SERVER_ERROR,
			Json(CompareResponse {
				matched: false,
				confidence: 0,
				success: None,
				error: None,
			}),
		)
			.into_response(),
		Err(e) => {
			log_error!("compare-results failed: {}", e.detail());
			(
				StatusCode::INTERNAL_SERVER_ERROR,
				Json(CompareResponse {
					matched: false,
					confidence: 0,
					success: Some(false),
					error: Some("Failed to compare results".to_string()),
				}),
			)
				.into_response()
		}
	}
}

async fn assess_complexity(
	State(state): State<Arc<AppState>>,
	Json(body): Json<AssessRequest>,
) -> Response {
	match state.classifier.classify(&body.prompt).await {
		Ok(complexity) => Json(AssessResponse {
			complexity,
			success: true,
			error: None,
		})
		.into_response(),
		Err(e) => {
			let message = match &e {
				CellError::Backend { detail } => {
					log_error!("assess-complexity failed: {}", detail);
					"Failed to assess complexity".to_string()
				}
				other => other.to_string(),
			};
			(
				status(&e),
				Json(AssessResponse {
					complexity: Complexity::Medium,
					success: false,
					error: Some(message),
				}),
			)
				.into_response()
		}
	}
}

/// Bind and serve until the process is stopped
pub async fn serve(backend: Arc<dyn ModelBackend>, config: &Config) -> Result<()> {
	let address = format!("{}:{}", config.server.host, config.server.port);
	let app = router(Arc::new(AppState::new(backend, config)));

	let listener = TcpListener::bind(&address)
		.await
		.with_context(|| format!("Failed to bind {}", address))?;
	log_info!("Listening on http://{}", address);

	axum::serve(listener, app).await.context("Server error")?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{chat_reply, tool_reply, ScriptedBackend};
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use tower::ServiceExt;

	fn build(backend: ScriptedBackend) -> (Router, Arc<ScriptedBackend>) {
		let backend = Arc::new(backend);
		let state = AppState::new(backend.clone(), &Config::default());
		(router(Arc::new(state)), backend)
	}

	async fn post_json(
		app: Router,
		uri: &str,
		body: serde_json::Value,
	) -> (StatusCode, serde_json::Value) {
		post_raw(app, uri, body.to_string()).await
	}

	async fn post_raw(app: Router, uri: &str, body: String) -> (StatusCode, serde_json::Value) {
		let response = app
			.oneshot(
				Request::builder()
					.method("POST")
					.uri(uri)
					.header("content-type", "application/json")
					.body(Body::from(body))
					.unwrap(),
			)
			.await
			.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&bytes).unwrap())
	}

	#[tokio::test]
	async fn test_fill_cell_success() {
		let (app, _) = build(ScriptedBackend::new().push_tool(Ok(tool_reply(
			"Acme's site is [here](https://acme.com) (Source: https://acme.com)",
			&[],
		))));

		let (status, body) = post_json(
			app,
			"/fill-cell",
			serde_json::json!({
				"prompt": "Find the official website",
				"context": {"Company Name": "Acme Corp"},
				"columnKey": "website",
				"rowData": {"company": "Acme Corp", "website": ""},
			}),
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["value"], "Acme's site is");
		assert_eq!(body["source"], "https://acme.com");
		assert_eq!(body["success"], true);
		assert!(body.get("error").is_none());
	}

	#[tokio::test]
	async fn test_fill_cell_bad_body_keeps_result_shape() {
		let (app, backend) = build(ScriptedBackend::new());
		let (status, body) = post_json(
			app,
			"/fill-cell",
			serde_json::json!({"prompt": "Find it", "columnKey": "website", "context": {"Employees": 5}}),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["success"], false);
		assert_eq!(body["value"], "");
		assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));

		let (app, _) = build(ScriptedBackend::new());
		let (status, body) = post_raw(app, "/api/fill-cell", "{\"prompt\": ".to_string()).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["success"], false);
		assert_eq!(backend.tool_call_count(), 0);
	}

	#[tokio::test]
	async fn test_fill_cell_invalid_key_is_401() {
		let (app, backend) = build(ScriptedBackend::new().push_tool(Err(
			CellError::from_backend_failure(None, "Invalid API key provided"),
		)));

		let (status, body) = post_json(
			app,
			"/api/fill-cell",
			serde_json::json!({"prompt": "Find the website", "columnKey": "website", "model": "fast"}),
		)
		.await;

		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["success"], false);
		assert_eq!(body["error"], "Invalid API key");
		assert_eq!(backend.tool_call_count(), 1);
	}

	#[tokio::test]
	async fn test_fill_cell_status_mapping() {
		let (app, backend) = build(ScriptedBackend::new());
		let (status, body) =
			post_json(app, "/fill-cell", serde_json::json!({"prompt": "Find it"})).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "Missing required fields: prompt and columnKey");
		assert_eq!(backend.tool_call_count(), 0);

		let (app, _) = build(ScriptedBackend::unconfigured());
		let (status, body) = post_json(
			app,
			"/fill-cell",
			serde_json::json!({"prompt": "Find it", "columnKey": "website"}),
		)
		.await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body["error"], "OpenAI API key not configured");

		let (app, _) = build(
			ScriptedBackend::new()
				.push_tool(Err(CellError::from_backend_failure(Some(429), "Rate limit reached"))),
		);
		let (status, body) = post_json(
			app,
			"/fill-cell",
			serde_json::json!({"prompt": "Find it", "columnKey": "website"}),
		)
		.await;
		assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(body["error"], "API quota exceeded");
	}

	#[tokio::test]
	async fn test_compare_results() {
		let (app, _) = build(ScriptedBackend::new().push_chat(Ok(chat_reply("YES"))));
		let (status, body) = post_json(
			app,
			"/compare-results",
			serde_json::json!({"result1": "https://acme.com", "result2": "acme.com"}),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["match"], true);
		assert!(body["confidence"].as_u64().unwrap() >= 80);

		let (app, _) = build(ScriptedBackend::new());
		let (_, body) = post_json(
			app,
			"/compare-results",
			serde_json::json!({"result1": "Not Found", "result2": ""}),
		)
		.await;
		assert_eq!(body, serde_json::json!({"match": true, "confidence": 100}));

		let (app, _) = build(ScriptedBackend::new().push_chat(Err(CellError::backend("boom"))));
		let (status, body) = post_json(
			app,
			"/compare-results",
			serde_json::json!({"result1": "a", "result2": "b"}),
		)
		.await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body["error"], "Failed to compare results");
	}

	#[tokio::test]
	async fn test_assess_complexity() {
		let (app, _) = build(ScriptedBackend::new().push_chat(Ok(chat_reply("complex"))));
		let (status, body) = post_json(
			app,
			"/assess-complexity",
			serde_json::json!({"prompt": "Assess the competitive landscape"}),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["complexity"], "complex");
		assert_eq!(body["success"], true);

		let (app, _) = build(ScriptedBackend::new());
		let (status, body) =
			post_json(app, "/api/assess-complexity", serde_json::json!({})).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["complexity"], "medium");
		assert_eq!(body["error"], "Prompt is required");

		let (app, _) = build(ScriptedBackend::new().push_chat(Err(CellError::backend("boom"))));
		let (status, body) =
			post_json(app, "/assess-complexity", serde_json::json!({"prompt": "x"})).await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body["error"], "Failed to assess complexity");
	}

	#[tokio::test]
	async fn test_health() {
		let (app, _) = build(ScriptedBackend::unconfigured());
		let response = app
			.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(body["configured"], false);
	}
}
