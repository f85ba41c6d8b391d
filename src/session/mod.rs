//! Session state for composing runs and browsing results.
//!
//! A [`Session`] owns everything a single user session needs: the catalog, the run
//! being composed, and the run-list / run-detail view state. It is created explicitly
//! by the front end and dropped when the front end exits.

mod builder;
mod catalog;
mod submit;
mod views;

pub use builder::{add_proc_to_run, RunBuilder};
pub use catalog::Catalog;
pub use submit::{submit_run, SubmitOutcome};
pub use views::{load_figures, load_log, load_run, RunDetailView, RunListView};

use crate::api::Backend;
use crate::format::TimestampFormat;
use crate::model::RunId;

/// The screen a session is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    NewRun,
    RunList,
    RunDetail(Option<RunId>),
}

pub struct Session<B> {
    backend: B,
    timestamps: TimestampFormat,
    view: View,
    catalog: Catalog,
    builder: RunBuilder,
    run_list: RunListView,
    run_detail: RunDetailView,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B, timestamps: TimestampFormat) -> Self {
        Self {
            backend,
            timestamps,
            view: View::default(),
            catalog: Catalog::default(),
            builder: RunBuilder::new(),
            run_list: RunListView::default(),
            run_detail: RunDetailView::default(),
        }
    }

    /// Load the catalog for the new-run view.
    pub async fn start(&mut self) {
        self.view = View::NewRun;
        self.catalog = Catalog::load(&self.backend).await;
    }

    /// Switch views, discarding the draft when leaving the new-run view and loading
    /// whatever the target view shows.
    pub async fn navigate(&mut self, view: View) {
        tracing::debug!(from = ?self.view, to = ?view, "navigate");
        if self.view == View::NewRun && view != View::NewRun {
            self.builder = RunBuilder::new();
        }
        match &view {
            View::NewRun => {
                self.view = view;
                self.catalog = Catalog::load(&self.backend).await;
            }
            View::RunList => {
                self.view = view;
                self.run_list = RunListView::load(&self.backend, &self.timestamps).await;
            }
            View::RunDetail(id) => {
                self.run_detail =
                    RunDetailView::load(&self.backend, id.as_ref(), &self.timestamps).await;
                self.view = view;
            }
        }
    }

    /// Submit the draft, wait for it to settle, then move to the next view.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let run = self.builder.to_run_init();
        let outcome = submit_run(&self.backend, &run).await;
        self.navigate(outcome.next_view()).await;
        outcome
    }

    #[cfg(test)]
    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn builder(&self) -> &RunBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut RunBuilder {
        &mut self.builder
    }

    /// Select a catalog process into the working slot.
    pub fn select(&mut self, proc_name: &str) -> bool {
        self.builder.select(&self.catalog, proc_name)
    }

    pub fn run_list(&self) -> &RunListView {
        &self.run_list
    }

    pub fn run_detail(&self) -> &RunDetailView {
        &self.run_detail
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::model::{ProcessArgument, ProcessInit, RunResult};
    use pretty_assertions::assert_eq;

    fn catalog_backend() -> FakeBackend {
        FakeBackend {
            proc_inits: Some(vec![ProcessInit {
                proc_name: "train".into(),
                arguments: vec![ProcessArgument::new("lr", "0.1")],
            }]),
            environment_names: Some(vec!["default".into()]),
            run_results: Some(Vec::new()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn compose_and_submit_end_to_end() {
        let mut session = Session::new(catalog_backend(), TimestampFormat::utc());
        session.start().await;
        session.builder_mut().set_description("first");
        assert!(session.select("train"));
        session.builder_mut().add_working();

        let entries = session.builder().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].run_order(), 0);
        assert_eq!(entries[0].arguments_str(), "lr:0.1");
        let expected = session.builder().to_run_init();

        let outcome = session.submit().await;
        assert!(outcome.is_submitted());
        assert_eq!(session.view(), &View::RunList);
        assert_eq!(session.backend().submitted(), vec![expected]);
        assert!(session.builder().entries().is_empty());
        assert_eq!(
            session.backend().calls().last().map(String::as_str),
            Some("GET api/runs/")
        );
    }

    #[tokio::test]
    async fn failed_submit_still_navigates() {
        let backend = FakeBackend {
            submit_unreachable: true,
            ..catalog_backend()
        };
        let mut session = Session::new(backend, TimestampFormat::utc());
        session.start().await;
        session.select("train");
        session.builder_mut().add_working();
        let outcome = session.submit().await;
        assert!(!outcome.is_submitted());
        assert_eq!(session.view(), &View::RunList);
    }

    #[tokio::test]
    async fn empty_catalog_is_tolerated() {
        let mut session = Session::new(FakeBackend::default(), TimestampFormat::utc());
        session.start().await;
        assert!(session.catalog().is_empty());
        assert!(!session.select("train"));
        assert!(!session.builder_mut().add_working());
    }

    #[tokio::test]
    async fn run_list_shows_identical_times_in_order() {
        let stamp = |id: i64| RunResult {
            id: Some(id),
            timestamp_start: Some(1_000_000_000.0),
            ..Default::default()
        };
        let backend = FakeBackend {
            run_results: Some(vec![stamp(5), stamp(9)]),
            ..Default::default()
        };
        let mut session = Session::new(backend, TimestampFormat::utc());
        session.navigate(View::RunList).await;
        let runs = &session.run_list().run_results;
        assert_eq!(runs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![Some(5), Some(9)]);
        assert_eq!(runs[0].timestamp_start, "2001-09-09 01:46:40");
        assert_eq!(runs[0].timestamp_start, runs[1].timestamp_start);
    }

    #[tokio::test]
    async fn detail_without_run_id_is_empty() {
        let mut session = Session::new(FakeBackend::default(), TimestampFormat::utc());
        session
            .navigate(View::RunDetail(RunId::from_location("/rundetail")))
            .await;
        assert_eq!(session.run_detail(), &RunDetailView::default());
        assert!(session.backend().calls().is_empty());
    }
}
