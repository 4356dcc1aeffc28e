use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};
use umya_spreadsheet::Spreadsheet;

use crate::notify::{self, CompletionNotice, NotifyError};
use crate::server::AppState;
use crate::storage::StorageError;
use crate::template::{self, ReplacementTable, TemplateError};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Where a finished report ended up.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub object_key: String,
    pub report_url: String,
}

/// Storage key for a generated report.
pub fn output_key(output_id: i64) -> String {
    format!("processed_template_{output_id}.xlsx")
}

/// Run substitution, persistence and notification as a background job.
///
/// The caller has already acknowledged the request by the time this runs;
/// failures are logged here and carried on the returned handle for anyone
/// who chooses to await it.
pub fn spawn(
    state: Arc<AppState>,
    book: Spreadsheet,
    table: ReplacementTable,
    output_id: i64,
    template_id: String,
) -> JoinHandle<Result<ReportOutcome, ReportError>> {
    tokio::spawn(async move {
        let result = generate(&state, book, &table, output_id, &template_id).await;
        match &result {
            Ok(outcome) => {
                info!("report for output {} stored at {}", output_id, outcome.report_url);
            }
            Err(e) => {
                error!("report generation for output {} failed: {}", output_id, e);
            }
        }
        result
    })
}

async fn generate(
    state: &AppState,
    mut book: Spreadsheet,
    table: &ReplacementTable,
    output_id: i64,
    template_id: &str,
) -> Result<ReportOutcome, ReportError> {
    template::substitute(&mut book, table);
    let bytes = template::serialize(&book)?;

    let object_key = output_key(output_id);
    state
        .store
        .put(&state.config.report_bucket, &object_key, bytes)
        .await?;

    let report_url = state
        .store
        .object_url(&state.config.report_bucket, &object_key);

    let notice = CompletionNotice {
        output_id,
        template_id: template_id.to_string(),
        report_url: report_url.clone(),
    };
    notify::send(&state.http, &state.config.notify_url, &notice).await?;

    Ok(ReportOutcome {
        object_key,
        report_url,
    })
}
