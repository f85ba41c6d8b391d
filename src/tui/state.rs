use crate::format::DisplayRun;
use crate::model::RunId;
use crate::orchestrator::UiEvent;
use crate::session::RunDetailView;

pub const TAB_RUNS: usize = 0;
pub const TAB_DETAIL: usize = 1;
pub const TAB_HELP: usize = 2;

#[derive(Default)]
pub struct UiState {
    pub tab: usize,
    pub info: String,

    pub runs: Vec<DisplayRun>,
    pub runs_loading: bool,
    pub runs_selected: usize, // Index into `runs`
    pub runs_scroll_offset: usize,

    pub detail: RunDetailView,
    pub detail_scroll: usize,
    pub last_exported_path: Option<String>,
}

impl UiState {
    /// Apply a fetch result. Results for a run that is no longer open are dropped.
    pub fn apply_event(&mut self, ev: UiEvent) {
        match ev {
            UiEvent::RunsLoaded(view) => {
                self.runs = view.run_results;
                self.runs_loading = false;
                if self.runs_selected >= self.runs.len() {
                    self.runs_selected = self.runs.len().saturating_sub(1);
                }
                self.runs_scroll_offset = self.runs_scroll_offset.min(self.runs_selected);
                self.info = format!("Loaded {} run(s)", self.runs.len());
            }
            UiEvent::RunLoaded {
                run_id,
                run_result,
            } => {
                if self.is_open(&run_id) {
                    self.detail.run_result = run_result;
                }
            }
            UiEvent::LogLoaded { run_id, log } => {
                if self.is_open(&run_id) {
                    self.detail.log = log;
                }
            }
            UiEvent::FiguresLoaded { run_id, figures } => {
                if self.is_open(&run_id) {
                    self.detail.figures = figures;
                }
            }
        }
    }

    fn is_open(&self, run_id: &RunId) -> bool {
        self.detail.run_id.as_ref() == Some(run_id)
    }

    pub fn selected_run_id(&self) -> Option<RunId> {
        self.runs
            .get(self.runs_selected)
            .and_then(|r| r.id)
            .map(RunId::from)
    }

    /// Reset the detail view for `run_id`; its slices fill in as events arrive.
    pub fn open_run(&mut self, run_id: RunId) {
        self.detail = RunDetailView {
            run_id: Some(run_id),
            ..Default::default()
        };
        self.detail_scroll = 0;
        self.tab = TAB_DETAIL;
    }

    pub fn select_prev(&mut self) {
        if self.runs_selected > 0 {
            self.runs_selected -= 1;
            if self.runs_selected < self.runs_scroll_offset {
                self.runs_scroll_offset = self.runs_selected;
            }
        }
    }

    pub fn select_next(&mut self, visible_rows: usize) {
        if self.runs_selected + 1 < self.runs.len() {
            self.runs_selected += 1;
            let visible_rows = visible_rows.max(1);
            if self.runs_selected >= self.runs_scroll_offset + visible_rows {
                self.runs_scroll_offset = self.runs_selected + 1 - visible_rows;
            }
        }
    }
}
