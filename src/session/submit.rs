use super::View;
use crate::api::{ApiError, Backend};
use crate::model::{RunId, RunInit};

/// How a submission settled.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The backend answered. Its status is informational only.
    Submitted { status: u16, run_id: Option<RunId> },
    /// The request never reached the backend.
    Failed(ApiError),
}

impl SubmitOutcome {
    #[cfg(test)]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }

    /// Where to go once the submission has settled; the run list either way.
    pub fn next_view(&self) -> View {
        View::RunList
    }
}

/// Post `run` to `api/newrun` and wait for it to settle. Never retried.
pub async fn submit_run<B: Backend + ?Sized>(backend: &B, run: &RunInit) -> SubmitOutcome {
    tracing::info!(
        description = %run.description,
        environment = %run.environment_name,
        procs = run.proc_inits.len(),
        "submitting run"
    );
    match backend.submit_run(run).await {
        Ok(receipt) => SubmitOutcome::Submitted {
            status: receipt.status,
            run_id: receipt.run_id,
        },
        Err(e) => {
            tracing::error!(error = %e, "run submission failed");
            SubmitOutcome::Failed(e)
        }
    }
}
