//! Append-only composition of a run definition.

use super::catalog::Catalog;
use crate::model::{ProcessArgument, ProcessInit, RunInit, RunProcessEntry, DEFAULT_ENVIRONMENT};

/// Commit `working` to the end of `entries`.
///
/// Returns the extended entry list and a fresh, empty working invocation. The new
/// entry gets `run_order == entries.len()` and a deep copy of the working arguments;
/// existing entries are carried over unchanged. An empty `proc_name` is not rejected
/// here.
pub fn add_proc_to_run(
    working: &ProcessInit,
    entries: &[RunProcessEntry],
) -> (Vec<RunProcessEntry>, ProcessInit) {
    let mut next = Vec::with_capacity(entries.len() + 1);
    next.extend_from_slice(entries);
    next.push(RunProcessEntry::snapshot(working, entries.len()));
    (next, ProcessInit::default())
}

/// Composition state for one new-run session.
#[derive(Debug, Clone)]
pub struct RunBuilder {
    description: String,
    environment_name: String,
    working: ProcessInit,
    entries: Vec<RunProcessEntry>,
}

impl Default for RunBuilder {
    fn default() -> Self {
        Self {
            description: String::new(),
            environment_name: DEFAULT_ENVIRONMENT.to_string(),
            working: ProcessInit::default(),
            entries: Vec::new(),
        }
    }
}

impl RunBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog process into the working slot, with its default arguments.
    ///
    /// Returns `false` and clears the working slot when the catalog has no such process.
    pub fn select(&mut self, catalog: &Catalog, proc_name: &str) -> bool {
        match catalog.find(proc_name) {
            Some(p) => {
                self.working = p.clone();
                true
            }
            None => {
                tracing::warn!(proc_name, "process not in catalog");
                self.working = ProcessInit::default();
                false
            }
        }
    }

    /// Set an argument on the working invocation, adding it if the template lacks it.
    ///
    /// Returns `false` when nothing is selected.
    pub fn set_argument(&mut self, name: &str, value: &str) -> bool {
        if self.working.is_empty() {
            return false;
        }
        match self.working.arguments.iter_mut().find(|a| a.name == name) {
            Some(arg) => arg.value = value.to_string(),
            None => self.working.arguments.push(ProcessArgument::new(name, value)),
        }
        true
    }

    /// Commit the working invocation through [`add_proc_to_run`].
    ///
    /// Returns `false` and changes nothing when nothing is selected.
    pub fn add_working(&mut self) -> bool {
        if self.working.is_empty() {
            tracing::debug!("no process selected; nothing added");
            return false;
        }
        let (entries, fresh) = add_proc_to_run(&self.working, &self.entries);
        self.entries = entries;
        self.working = fresh;
        true
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_environment(&mut self, environment_name: impl Into<String>) {
        self.environment_name = environment_name.into();
    }

    pub fn working(&self) -> &ProcessInit {
        &self.working
    }

    pub fn entries(&self) -> &[RunProcessEntry] {
        &self.entries
    }

    pub fn to_run_init(&self) -> RunInit {
        RunInit {
            description: self.description.clone(),
            environment_name: self.environment_name.clone(),
            proc_inits: self.entries.clone(),
        }
    }
}
