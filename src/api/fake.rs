//! In-memory [`Backend`] for session tests. Records every call it receives.

use super::{ApiError, Backend, SubmitReceipt};
use crate::model::{ProcessInit, RunId, RunInit, RunResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

/// `None` for a canned response means the endpoint fails with HTTP 500.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub proc_inits: Option<Vec<ProcessInit>>,
    pub environment_names: Option<Vec<String>>,
    pub run_results: Option<Vec<RunResult>>,
    pub runs_by_id: HashMap<String, RunResult>,
    pub logs: HashMap<String, String>,
    pub figures: HashMap<String, Vec<String>>,
    /// Simulate a connection failure on `submit_run`.
    pub submit_unreachable: bool,
    pub calls: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<RunInit>>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<RunInit> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn server_error(path: &str) -> ApiError {
        ApiError::Status {
            url: format!("fake://{path}"),
            status: 500,
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn proc_inits(&self) -> Result<Vec<ProcessInit>, ApiError> {
        self.record("GET api/proc_inits".into());
        self.proc_inits
            .clone()
            .ok_or_else(|| Self::server_error("api/proc_inits"))
    }

    async fn environment_names(&self) -> Result<Vec<String>, ApiError> {
        self.record("GET api/envs".into());
        self.environment_names
            .clone()
            .ok_or_else(|| Self::server_error("api/envs"))
    }

    async fn create_environment(&self, name: &str) -> Result<String, ApiError> {
        self.record(format!("POST api/newenv {name}"));
        Ok(name.to_string())
    }

    async fn submit_run(&self, run: &RunInit) -> Result<SubmitReceipt, ApiError> {
        self.record("POST api/newrun".into());
        if self.submit_unreachable {
            return Err(ApiError::Transport {
                url: "fake://api/newrun".into(),
                source: Box::new(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)),
            });
        }
        self.submitted.lock().unwrap().push(run.clone());
        Ok(SubmitReceipt {
            status: 201,
            run_id: RunId::new(self.submitted.lock().unwrap().len().to_string()),
        })
    }

    async fn run_results(&self) -> Result<Vec<RunResult>, ApiError> {
        self.record("GET api/runs/".into());
        self.run_results
            .clone()
            .ok_or_else(|| Self::server_error("api/runs/"))
    }

    async fn run_result(&self, id: &RunId) -> Result<RunResult, ApiError> {
        self.record(format!("GET api/run/{id}"));
        self.runs_by_id
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Self::server_error("api/run"))
    }

    async fn log(&self, id: &RunId) -> Result<String, ApiError> {
        self.record(format!("GET api/log/{id}"));
        self.logs
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Self::server_error("api/log"))
    }

    async fn figures(&self, id: &RunId) -> Result<Vec<String>, ApiError> {
        self.record(format!("GET api/figures/{id}"));
        self.figures
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Self::server_error("api/figures"))
    }

    async fn fetch_figure(&self, id: &RunId, name: &str) -> Result<Bytes, ApiError> {
        self.record(format!("GET api/figure/{id}/{name}"));
        Ok(Bytes::from(format!("{id}/{name}")))
    }
}
