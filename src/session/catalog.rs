use crate::api::Backend;
use crate::model::ProcessInit;
use serde::Serialize;

/// Processes and environments the backend offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    proc_inits: Vec<ProcessInit>,
    environment_names: Vec<String>,
}

impl Catalog {
    #[cfg(test)]
    pub fn new(proc_inits: Vec<ProcessInit>, environment_names: Vec<String>) -> Self {
        Self {
            proc_inits,
            environment_names,
        }
    }

    /// Fetch both lists concurrently. A failed fetch leaves its list empty.
    pub async fn load<B: Backend + ?Sized>(backend: &B) -> Self {
        let (procs, envs) = futures::join!(backend.proc_inits(), backend.environment_names());
        let proc_inits = procs.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load process catalog");
            Vec::new()
        });
        let environment_names = envs.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load environment names");
            Vec::new()
        });
        tracing::debug!(
            procs = proc_inits.len(),
            environments = environment_names.len(),
            "catalog loaded"
        );
        Self {
            proc_inits,
            environment_names,
        }
    }

    pub fn proc_inits(&self) -> &[ProcessInit] {
        &self.proc_inits
    }

    pub fn environment_names(&self) -> &[String] {
        &self.environment_names
    }

    pub fn find(&self, proc_name: &str) -> Option<&ProcessInit> {
        self.proc_inits.iter().find(|p| p.proc_name == proc_name)
    }

    pub fn proc_names(&self) -> impl Iterator<Item = &str> {
        self.proc_inits.iter().map(|p| p.proc_name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.proc_inits.is_empty()
    }
}
