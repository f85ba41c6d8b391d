//! Client side of the simpyl REST API.
//!
//! [`Backend`] is the seam the session layer talks through; [`HttpBackend`] is the
//! `reqwest` implementation used by the CLI and TUI.

mod error;
#[cfg(test)]
pub(crate) mod fake;
mod http;

pub use error::ApiError;
pub use http::HttpBackend;

use crate::model::{ProcessInit, RunId, RunInit, RunResult};
use async_trait::async_trait;
use bytes::Bytes;

/// What the backend said when a run was posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub status: u16,
    /// Present when the reply body carried the new run's `id`.
    pub run_id: Option<RunId>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET api/proc_inits`
    async fn proc_inits(&self) -> Result<Vec<ProcessInit>, ApiError>;
    /// `GET api/envs`
    async fn environment_names(&self) -> Result<Vec<String>, ApiError>;
    /// `POST api/newenv`
    async fn create_environment(&self, name: &str) -> Result<String, ApiError>;
    /// `POST api/newrun`. Any HTTP reply counts as settled; only transport
    /// failures are errors.
    async fn submit_run(&self, run: &RunInit) -> Result<SubmitReceipt, ApiError>;
    /// `GET api/runs/`
    async fn run_results(&self) -> Result<Vec<RunResult>, ApiError>;
    /// `GET api/run/{id}`
    async fn run_result(&self, id: &RunId) -> Result<RunResult, ApiError>;
    /// `GET api/log/{id}`
    async fn log(&self, id: &RunId) -> Result<String, ApiError>;
    /// `GET api/figures/{id}`
    async fn figures(&self, id: &RunId) -> Result<Vec<String>, ApiError>;
    /// `GET api/figure/{id}/{name}`
    async fn fetch_figure(&self, id: &RunId, name: &str) -> Result<Bytes, ApiError>;
}
