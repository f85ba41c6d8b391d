mod export;
mod help;
mod state;

use crate::api::Backend;
use crate::format::{DisplayRun, TimestampFormat};
use crate::orchestrator::{self, UiCommand, UiEvent};
use crate::text_summary::run_detail_summary;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::{UiState, TAB_DETAIL, TAB_HELP, TAB_RUNS};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Browse runs interactively until the user quits.
pub async fn run<B: Backend + 'static>(backend: B, timestamps: TimestampFormat) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    orchestrator::run_controller(Arc::new(backend), timestamps, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    match join_res {
        Ok(Ok(res)) => res,
        Ok(Err(_)) => Err(anyhow::anyhow!("TUI thread panicked")),
        Err(e) => Err(anyhow::anyhow!("failed to join TUI thread: {e}")),
    }
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut event_rx: UnboundedReceiver<UiEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState {
        runs_loading: true,
        info: "Loading runs...".into(),
        ..Default::default()
    };
    let _ = cmd_tx.send(UiCommand::RefreshRuns);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut visible_rows = 20usize;

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal
                .draw(|f| {
                    // Tabs take 3 rows, the list block adds borders and a header.
                    visible_rows = (f.area().height as usize).saturating_sub(6).max(1);
                    draw(f.area(), f, &state)
                })
                .ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 3;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = TAB_HELP;
                    }
                    (_, KeyCode::Esc) => {
                        state.tab = TAB_RUNS;
                    }
                    (_, KeyCode::Char('r')) => {
                        if state.tab == TAB_DETAIL {
                            if let Some(id) = state.detail.run_id.clone() {
                                state.open_run(id.clone());
                                state.info = format!("Reloading run {id}");
                                let _ = cmd_tx.send(UiCommand::OpenRun(id));
                            }
                        } else {
                            state.runs_loading = true;
                            state.info = "Refreshing runs...".into();
                            let _ = cmd_tx.send(UiCommand::RefreshRuns);
                        }
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
                        if state.tab == TAB_DETAIL {
                            state.detail_scroll = state.detail_scroll.saturating_sub(1);
                        } else if state.tab == TAB_RUNS {
                            state.select_prev();
                        }
                    }
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
                        if state.tab == TAB_DETAIL {
                            state.detail_scroll = state.detail_scroll.saturating_add(1);
                        } else if state.tab == TAB_RUNS {
                            state.select_next(visible_rows);
                        }
                    }
                    (_, KeyCode::Enter) => {
                        if state.tab == TAB_RUNS {
                            match state.selected_run_id() {
                                Some(id) => {
                                    state.open_run(id.clone());
                                    state.info = format!("Opened run {id}");
                                    let _ = cmd_tx.send(UiCommand::OpenRun(id));
                                }
                                None => state.info = "Selected run has no id".into(),
                            }
                        }
                    }
                    (_, KeyCode::Char('e')) => {
                        if state.tab == TAB_DETAIL {
                            match export::export_detail_json(&state.detail) {
                                Ok(p) => {
                                    state.info = format!("Exported JSON: {}", p.display());
                                    state.last_exported_path = Some(p.display().to_string());
                                }
                                Err(e) => state.info = format!("JSON export failed: {e:#}"),
                            }
                        }
                    }
                    (_, KeyCode::Char('y')) => {
                        if state.tab == TAB_DETAIL {
                            state.info = match export::copy_to_clipboard(&state.detail.log) {
                                Ok(()) => "Copied log to clipboard".into(),
                                Err(e) => format!("Clipboard failed: {e:#}"),
                            };
                        }
                    }
                    (_, KeyCode::Char('p')) => {
                        if let Some(path) = state.last_exported_path.clone() {
                            state.info = match export::copy_to_clipboard(&path) {
                                Ok(()) => format!("Copied to clipboard: {path}"),
                                Err(e) => format!("Clipboard failed: {e:#}"),
                            };
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Runs"), Line::from("Detail"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("simpyl-cli"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_RUNS => draw_runs(chunks[1], f, state),
        TAB_DETAIL => draw_detail(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    let status = Paragraph::new(Line::from(vec![
        Span::styled(" info: ", Style::default().fg(Color::Gray)),
        Span::raw(state.info.as_str()),
    ]));
    f.render_widget(status, chunks[2]);
}

fn run_row(run: &DisplayRun) -> String {
    let id = run.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
    format!(
        "{:>5}  {:<19}  {:<19}  {:<8}  {}",
        id, run.timestamp_start, run.timestamp_stop, run.status, run.description
    )
}

fn draw_runs(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let max_items = (area.height as usize).saturating_sub(3);
    let total = state.runs.len();
    let pos = if total > 0 { state.runs_selected + 1 } else { 0 };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!(
            "{:>5}  {:<19}  {:<19}  {:<8}  {}",
            "ID", "STARTED", "STOPPED", "STATUS", "DESCRIPTION"
        ),
        Style::default().fg(Color::Gray),
    )));

    if total == 0 {
        lines.push(Line::from(if state.runs_loading {
            "Loading..."
        } else {
            "No runs."
        }));
    }

    for (i, run) in state
        .runs
        .iter()
        .enumerate()
        .skip(state.runs_scroll_offset)
        .take(max_items)
    {
        let style = if i == state.runs_selected {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(run_row(run), style)));
    }

    let title = format!("Runs ({pos}/{total})");
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_detail(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let summary = run_detail_summary(&state.detail, true);
    let title = match &state.detail.run_id {
        Some(id) => format!("Run {id}"),
        None => "Run".into(),
    };
    let lines: Vec<Line> = summary.lines.into_iter().map(Line::from).collect();
    let scroll = state.detail_scroll.min(u16::MAX as usize) as u16;
    let p = Paragraph::new(lines)
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}
