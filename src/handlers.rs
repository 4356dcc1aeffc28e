use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::report;
use crate::server::AppState;
use crate::template::{self, PlaceholderMap, ReplacementTable};

#[derive(Debug, Deserialize)]
pub struct ExtractPlaceholdersRequest {
    pub bucket_name: String,
    pub object_key: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractPlaceholdersResponse {
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Vec<String>>,
    pub change_key_list: PlaceholderMap,
}

#[derive(Debug, Deserialize)]
pub struct ReportGenerationRequest {
    pub output_id: i64,
    pub template_id: String,
    pub template_url: String,
    /// Accepted for wire compatibility; generation ignores it.
    pub template_color: String,
    pub replace_info: ReplacementTable,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceRequest {
    pub key: String,
    pub value: String,
}

pub async fn root() -> impl IntoResponse {
    Json(json!({"message": "Hello, API is working!"}))
}

pub async fn replace_text(Json(data): Json<ReplaceRequest>) -> impl IntoResponse {
    Json(json!({"replaced": data.value.replace("{key}", &data.key)}))
}

/// Scan a stored workbook for placeholders.
///
/// Failures are reported inside a 200 body (an `error` list plus an empty
/// `change_key_list`); callers inspect the payload, not the status code.
pub async fn extract_placeholders(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExtractPlaceholdersRequest>,
) -> impl IntoResponse {
    info!(
        "extracting placeholders from bucket: {}, object: {}",
        request.bucket_name, request.object_key
    );
    let template_id = template_id_from_key(&request.object_key);

    let extracted = match state.store.get(&request.bucket_name, &request.object_key).await {
        Ok(bytes) => template::extract(&bytes).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match extracted {
        Ok(change_key_list) => {
            info!("successfully extracted placeholders: {:?}", change_key_list);
            Json(ExtractPlaceholdersResponse {
                template_id,
                error: None,
                change_key_list,
            })
        }
        Err(message) => {
            error!("error processing Excel file: {}", message);
            Json(ExtractPlaceholdersResponse {
                template_id,
                error: Some(vec![message]),
                change_key_list: PlaceholderMap::new(),
            })
        }
    }
}

/// Kick off report generation.
///
/// The template is fetched and parsed up front, so a bad location or corrupt
/// workbook surfaces as a 500 here; everything after the acknowledgment runs
/// out-of-band in a background job.
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportGenerationRequest>,
) -> Response {
    let template_key = template_key_from_url(&request.template_url);

    let bytes = match state
        .store
        .get(&state.config.report_bucket, template_key)
        .await
    {
        Ok(bytes) => bytes,
        Err(e) => return generation_error(e.to_string()),
    };

    let book = match template::load_workbook(&bytes) {
        Ok(book) => book,
        Err(e) => return generation_error(e.to_string()),
    };

    let _job = report::spawn(
        state,
        book,
        request.replace_info,
        request.output_id,
        request.template_id,
    );

    (
        StatusCode::OK,
        Json(json!({"message": "Processing started", "status": "success"})),
    )
        .into_response()
}

fn generation_error(detail: String) -> Response {
    error!("failed to start report generation: {}", detail);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": detail}))).into_response()
}

/// The template id is the object's file name up to its first dot.
pub fn template_id_from_key(object_key: &str) -> String {
    let file_name = object_key.rsplit('/').next().unwrap_or(object_key);
    file_name.split('.').next().unwrap_or(file_name).to_string()
}

/// Templates are addressed inside the report bucket by the last path segment
/// of the submitted URL.
fn template_key_from_url(template_url: &str) -> &str {
    template_url.rsplit('/').next().unwrap_or(template_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_id_is_file_stem_of_last_segment() {
        assert_eq!(template_id_from_key("templates/Foo.v2.xlsx"), "Foo");
        assert_eq!(template_id_from_key("report_template.xlsx"), "report_template");
        assert_eq!(template_id_from_key("a/b/c/plain"), "plain");
    }

    #[test]
    fn extraction_success_body_has_no_error_key() {
        let response = ExtractPlaceholdersResponse {
            template_id: "Foo".to_string(),
            error: None,
            change_key_list: PlaceholderMap::new(),
        };

        let value = serde_json::to_value(&response).expect("serialization failed");
        assert!(value.get("error").is_none());
        assert_eq!(value["template_id"], "Foo");
    }

    #[test]
    fn extraction_failure_body_carries_error_list_and_empty_map() {
        let response = ExtractPlaceholdersResponse {
            template_id: "Foo".to_string(),
            error: Some(vec!["NoSuchKey".to_string()]),
            change_key_list: PlaceholderMap::new(),
        };

        let value = serde_json::to_value(&response).expect("serialization failed");
        assert_eq!(value["error"][0], "NoSuchKey");
        assert_eq!(value["change_key_list"], serde_json::json!({}));
    }

    #[test]
    fn template_key_is_last_url_segment() {
        assert_eq!(
            template_key_from_url("https://bucket.s3.amazonaws.com/lease_template.xlsx"),
            "lease_template.xlsx"
        );
        assert_eq!(template_key_from_url("bare_key.xlsx"), "bare_key.xlsx");
    }
}
