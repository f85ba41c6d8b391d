//! Fetch controller for the run browser.
//!
//! Receives commands from the UI thread and runs each backend fetch as its own task.
//! Every completed fetch is reported as a separate event that carries only the slice
//! of state it fills.

use crate::api::Backend;
use crate::format::{DisplayRun, TimestampFormat};
use crate::model::RunId;
use crate::session::{load_figures, load_log, load_run, RunListView};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by the UI.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    RefreshRuns,
    OpenRun(RunId),
    Quit,
}

/// Fetch results delivered back to the UI.
#[derive(Debug, Clone)]
pub(crate) enum UiEvent {
    RunsLoaded(RunListView),
    RunLoaded {
        run_id: RunId,
        run_result: Option<DisplayRun>,
    },
    LogLoaded {
        run_id: RunId,
        log: String,
    },
    FiguresLoaded {
        run_id: RunId,
        figures: Vec<String>,
    },
}

/// Serve UI commands until the UI quits or drops its sender.
pub(crate) async fn run_controller<B: Backend + 'static>(
    backend: Arc<B>,
    timestamps: TimestampFormat,
    event_tx: UnboundedSender<UiEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::RefreshRuns => {
                let backend = backend.clone();
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    let view = RunListView::load(backend.as_ref(), &timestamps).await;
                    let _ = tx.send(UiEvent::RunsLoaded(view));
                });
            }
            UiCommand::OpenRun(run_id) => {
                // Three independent fetches; completion order is not defined.
                let (b, tx, id) = (backend.clone(), event_tx.clone(), run_id.clone());
                tokio::spawn(async move {
                    let run_result = load_run(b.as_ref(), &id, &timestamps).await;
                    let _ = tx.send(UiEvent::RunLoaded {
                        run_id: id,
                        run_result,
                    });
                });
                let (b, tx, id) = (backend.clone(), event_tx.clone(), run_id.clone());
                tokio::spawn(async move {
                    let log = load_log(b.as_ref(), &id).await;
                    let _ = tx.send(UiEvent::LogLoaded { run_id: id, log });
                });
                let (b, tx) = (backend.clone(), event_tx.clone());
                tokio::spawn(async move {
                    let figures = load_figures(b.as_ref(), &run_id).await;
                    let _ = tx.send(UiEvent::FiguresLoaded { run_id, figures });
                });
            }
            UiCommand::Quit => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::model::RunResult;

    #[tokio::test]
    async fn open_run_reports_each_slice_separately() {
        let mut backend = FakeBackend::default();
        backend.runs_by_id.insert(
            "2".into(),
            RunResult {
                id: Some(2),
                ..Default::default()
            },
        );
        backend.logs.insert("2".into(), "hello".into());

        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
        let controller = tokio::spawn(run_controller(
            Arc::new(backend),
            TimestampFormat::utc(),
            event_tx,
            cmd_rx,
        ));

        cmd_tx.send(UiCommand::OpenRun(RunId::new("2").unwrap())).unwrap();
        let mut got = (false, false, false);
        for _ in 0..3 {
            match event_rx.recv().await.unwrap() {
                UiEvent::RunLoaded { run_result, .. } => got.0 = run_result.is_some(),
                UiEvent::LogLoaded { log, .. } => got.1 = log == "hello",
                UiEvent::FiguresLoaded { figures, .. } => got.2 = figures.is_empty(),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(got, (true, true, true));

        cmd_tx.send(UiCommand::Quit).unwrap();
        controller.await.unwrap();
    }
}
