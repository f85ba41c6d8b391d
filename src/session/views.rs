//! Run-list and run-detail view state and the fetches that fill them.
//!
//! Every fetch is best-effort: on failure the slice it owns goes back to its empty
//! default and the error is logged.

use crate::api::Backend;
use crate::format::{format_run, DisplayRun, TimestampFormat};
use crate::model::RunId;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunListView {
    pub run_results: Vec<DisplayRun>,
}

impl RunListView {
    pub async fn load<B: Backend + ?Sized>(backend: &B, fmt: &TimestampFormat) -> Self {
        match backend.run_results().await {
            Ok(runs) => Self {
                run_results: runs.iter().map(|r| format_run(r, fmt)).collect(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "could not load run list");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunDetailView {
    pub run_id: Option<RunId>,
    pub run_result: Option<DisplayRun>,
    pub log: String,
    pub figures: Vec<String>,
}

impl RunDetailView {
    /// Fetch run, log and figures concurrently. Without an id nothing is requested.
    pub async fn load<B: Backend + ?Sized>(
        backend: &B,
        run_id: Option<&RunId>,
        fmt: &TimestampFormat,
    ) -> Self {
        let Some(id) = run_id else {
            return Self::default();
        };
        let (run_result, log, figures) = futures::join!(
            load_run(backend, id, fmt),
            load_log(backend, id),
            load_figures(backend, id)
        );
        Self {
            run_id: Some(id.clone()),
            run_result,
            log,
            figures,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.run_result.is_none() && self.log.is_empty() && self.figures.is_empty()
    }
}

pub async fn load_run<B: Backend + ?Sized>(
    backend: &B,
    id: &RunId,
    fmt: &TimestampFormat,
) -> Option<DisplayRun> {
    match backend.run_result(id).await {
        Ok(r) => Some(format_run(&r, fmt)),
        Err(e) => {
            tracing::warn!(run_id = %id, error = %e, "could not load run");
            None
        }
    }
}

pub async fn load_log<B: Backend + ?Sized>(backend: &B, id: &RunId) -> String {
    backend.log(id).await.unwrap_or_else(|e| {
        tracing::warn!(run_id = %id, error = %e, "could not load log");
        String::new()
    })
}

pub async fn load_figures<B: Backend + ?Sized>(backend: &B, id: &RunId) -> Vec<String> {
    backend.figures(id).await.unwrap_or_else(|e| {
        tracing::warn!(run_id = %id, error = %e, "could not load figures");
        Vec::new()
    })
}
