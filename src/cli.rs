use crate::api::{Backend, HttpBackend};
use crate::config::{self, ClientConfig, FileConfig};
use crate::format::TimestampFormat;
use crate::model::{figure_name, RunId};
use crate::session::{RunDetailView, Session, SubmitOutcome, View};
use crate::text_summary::{self, TextSummary};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "simpyl-cli",
    version,
    about = "Compose, submit and browse simpyl runs"
)]
pub struct Cli {
    /// Base URL of the simpyl server [default: http://127.0.0.1:5000]
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout [default: 30s]
    #[arg(long, global = true)]
    pub timeout: Option<humantime::Duration>,

    /// Show times in UTC instead of local time
    #[arg(long, global = true)]
    pub utc: bool,

    /// JSON config file (defaults to <config dir>/simpyl-cli/config.json when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Log more to stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List the processes and environments the server offers
    Procs,
    /// List environments
    Envs,
    /// Create an environment
    NewEnv {
        name: String,
    },
    /// Compose a run from catalog processes and submit it
    NewRun(NewRunArgs),
    /// List runs
    Runs,
    /// Show a run with its results, figures and log
    Run(RunArgs),
    /// Download a run's figures
    Figure(FigureArgs),
    /// Browse runs interactively
    #[cfg(feature = "tui")]
    Browse,
}

#[derive(Debug, clap::Args, Clone)]
pub struct NewRunArgs {
    /// Run description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Environment to run in [default: default]
    #[arg(long = "env")]
    pub environment: Option<String>,

    /// Process to add, in run order; arguments override catalog defaults
    /// (values cannot contain commas)
    #[arg(long = "proc", value_name = "NAME[:ARG=VALUE,...]", required = true)]
    pub procs: Vec<ProcSpec>,

    /// Print the run definition instead of submitting it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct RunArgs {
    /// Run id
    #[arg(long, conflicts_with = "location")]
    pub runid: Option<String>,

    /// Page location carrying a `runid` query parameter, e.g. http://host/rundetail?runid=3
    #[arg(long)]
    pub location: Option<String>,

    /// Leave the log out of text output
    #[arg(long)]
    pub no_log: bool,

    /// Also write the run detail as JSON to this file
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

impl RunArgs {
    fn run_id(&self) -> Option<RunId> {
        match (&self.runid, &self.location) {
            (Some(id), _) => RunId::new(id.clone()),
            (None, Some(location)) => RunId::from_location(location),
            (None, None) => None,
        }
    }
}

#[derive(Debug, clap::Args, Clone)]
pub struct FigureArgs {
    /// Run id
    #[arg(long)]
    pub runid: String,

    /// Figure file name; repeat for several (default: all figures of the run)
    #[arg(long = "name")]
    pub names: Vec<String>,

    /// Directory to write figures to
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}

/// A `--proc` value: a process name plus argument overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcSpec {
    pub proc_name: String,
    pub arguments: Vec<(String, String)>,
}

impl FromStr for ProcSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = match s.split_once(':') {
            Some((name, rest)) => (name.trim(), Some(rest)),
            None => (s.trim(), None),
        };
        if name.is_empty() {
            return Err("process name is empty".into());
        }
        let mut arguments = Vec::new();
        for pair in rest.into_iter().flat_map(|r| r.split(',')) {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| format!("argument `{pair}` is not ARG=VALUE"))?;
            let k = k.trim();
            if k.is_empty() {
                return Err(format!("argument `{pair}` has no name"));
            }
            arguments.push((k.to_string(), v.trim().to_string()));
        }
        Ok(Self {
            proc_name: name.to_string(),
            arguments,
        })
    }
}

/// Build a `ClientConfig` from the config file and CLI arguments.
pub fn build_config(args: &Cli, file: &FileConfig) -> ClientConfig {
    ClientConfig::resolve(
        file,
        args.base_url.as_deref(),
        args.timeout.map(std::time::Duration::from),
    )
}

pub async fn run(args: Cli, local: TimestampFormat) -> Result<()> {
    let file = config::load_file_config(args.config.as_deref())?;
    let cfg = build_config(&args, &file);
    let timestamps = if args.utc || file.utc.unwrap_or(false) {
        TimestampFormat::utc()
    } else {
        local
    };
    let backend = HttpBackend::new(&cfg).context("failed to set up HTTP client")?;
    tracing::info!(base_url = %backend.base_url(), "using simpyl server");

    #[cfg(feature = "tui")]
    {
        if matches!(args.command, Command::Browse) {
            return crate::tui::run(backend, timestamps).await;
        }
    }

    let (out_tx, out_handle) = spawn_output_writer();
    let res = run_command(&args, backend, timestamps, &out_tx).await;
    drop(out_tx);
    let _ = out_handle.await;
    res
}

async fn run_command(
    args: &Cli,
    backend: HttpBackend,
    timestamps: TimestampFormat,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    match &args.command {
        Command::Procs => {
            let mut session = Session::new(backend, timestamps);
            session.start().await;
            emit(out, args.json, session.catalog(), || {
                text_summary::catalog_summary(session.catalog())
            })
        }
        Command::Envs => {
            let envs = backend
                .environment_names()
                .await
                .context("failed to list environments")?;
            emit(out, args.json, &envs, || TextSummary {
                lines: envs.clone(),
            })
        }
        Command::NewEnv { name } => {
            let created = backend
                .create_environment(name)
                .await
                .with_context(|| format!("failed to create environment `{name}`"))?;
            let _ = out.send(OutputLine::Stderr(format!("Created environment: {created}")));
            Ok(())
        }
        Command::NewRun(new_run) => compose_and_submit(args, new_run, backend, timestamps, out).await,
        Command::Runs => {
            let mut session = Session::new(backend, timestamps);
            session.navigate(View::RunList).await;
            emit(out, args.json, session.run_list(), || {
                text_summary::run_list_summary(session.run_list())
            })
        }
        Command::Run(run_args) => {
            let mut session = Session::new(backend, timestamps);
            session.navigate(View::RunDetail(run_args.run_id())).await;
            let detail = session.run_detail();
            if let Some(id) = detail.run_id.as_ref().filter(|_| detail.is_empty()) {
                let _ = out.send(OutputLine::Stderr(format!(
                    "Run {id}: nothing returned (unknown id or server unreachable)"
                )));
            }
            if let Some(p) = run_args.export_json.as_deref() {
                export_json(p, detail)?;
                let _ = out.send(OutputLine::Stderr(format!("Exported JSON: {}", p.display())));
            }
            emit(out, args.json, detail, || {
                text_summary::run_detail_summary(detail, !run_args.no_log)
            })
        }
        Command::Figure(fig) => download_figures(fig, &backend, out).await,
        #[cfg(feature = "tui")]
        Command::Browse => Ok(()),
    }
}

async fn compose_and_submit(
    args: &Cli,
    new_run: &NewRunArgs,
    backend: HttpBackend,
    timestamps: TimestampFormat,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let mut session = Session::new(backend, timestamps);
    session.start().await;

    if session.catalog().is_empty() {
        anyhow::bail!("the server offers no processes (is it running?)");
    }
    session.builder_mut().set_description(new_run.description.clone());
    if let Some(env) = new_run.environment.as_deref() {
        if !session.catalog().environment_names().iter().any(|e| e == env) {
            tracing::warn!(environment = env, "environment not listed by the server");
        }
        session.builder_mut().set_environment(env);
    }

    for spec in &new_run.procs {
        if !session.select(&spec.proc_name) {
            let known: Vec<_> = session.catalog().proc_names().collect();
            anyhow::bail!(
                "unknown process `{}` (available: {})",
                spec.proc_name,
                known.join(", ")
            );
        }
        for (name, value) in &spec.arguments {
            if !session.builder().working().arguments.iter().any(|a| &a.name == name) {
                tracing::warn!(
                    proc_name = %spec.proc_name,
                    argument = %name,
                    "argument is not in the process template; sending it anyway"
                );
            }
            session.builder_mut().set_argument(name, value);
        }
        session.builder_mut().add_working();
    }
    tracing::info!(procs = session.builder().entries().len(), "run composed");

    let draft = session.builder().to_run_init();
    if new_run.dry_run {
        return emit(out, args.json, &draft, || text_summary::run_init_summary(&draft));
    }

    let outcome = session.submit().await;
    let list = session.run_list();
    match outcome {
        SubmitOutcome::Submitted { status, run_id } => {
            let msg = match (run_id, (200..300).contains(&status)) {
                (Some(id), true) => format!("Submitted run {id}"),
                (None, true) => "Submitted run".to_string(),
                (_, false) => format!("Submitted run; server replied HTTP {status}"),
            };
            let _ = out.send(OutputLine::Stderr(msg));
            emit(out, args.json, list, || text_summary::run_list_summary(list))
        }
        SubmitOutcome::Failed(e) => {
            emit(out, args.json, list, || text_summary::run_list_summary(list))?;
            let context = if e.is_network() {
                "run submission failed: server unreachable"
            } else {
                "run submission failed"
            };
            Err(anyhow::Error::new(e).context(context))
        }
    }
}

async fn download_figures(
    fig: &FigureArgs,
    backend: &HttpBackend,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let id = RunId::new(fig.runid.clone()).context("run id is empty")?;
    let names: Vec<String> = if fig.names.is_empty() {
        backend
            .figures(&id)
            .await
            .with_context(|| format!("failed to list figures of run {id}"))?
            .iter()
            .map(|f| figure_name(f).to_string())
            .collect()
    } else {
        fig.names.clone()
    };
    if names.is_empty() {
        let _ = out.send(OutputLine::Stderr(format!("Run {id} has no figures")));
        return Ok(());
    }

    std::fs::create_dir_all(&fig.out)
        .with_context(|| format!("create {}", fig.out.display()))?;
    for name in &names {
        let file_name = figure_name(name);
        if file_name.is_empty() || file_name == ".." || file_name == "." {
            anyhow::bail!("invalid figure name `{name}`");
        }
        let bytes = backend
            .fetch_figure(&id, file_name)
            .await
            .with_context(|| format!("failed to download figure `{file_name}`"))?;
        let path = fig.out.join(file_name);
        std::fs::write(&path, &bytes).with_context(|| format!("write {}", path.display()))?;
        let _ = out.send(OutputLine::Stdout(path.display().to_string()));
    }
    Ok(())
}

/// Print `value` as pretty JSON, or its text summary.
fn emit<T: Serialize + ?Sized>(
    out: &mpsc::UnboundedSender<OutputLine>,
    json: bool,
    value: &T,
    text: impl FnOnce() -> TextSummary,
) -> Result<()> {
    if json {
        let s = serde_json::to_string_pretty(value)?;
        let _ = out.send(OutputLine::Stdout(s));
    } else {
        for line in text().lines {
            let _ = out.send(OutputLine::Stdout(line));
        }
    }
    Ok(())
}

pub(crate) fn export_json(path: &Path, detail: &RunDetailView) -> Result<()> {
    let data = serde_json::to_vec_pretty(detail)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_spec_parses_name_and_overrides() {
        assert_eq!(
            "train:lr=0.1, epochs=3".parse::<ProcSpec>().unwrap(),
            ProcSpec {
                proc_name: "train".into(),
                arguments: vec![("lr".into(), "0.1".into()), ("epochs".into(), "3".into())],
            }
        );
        assert_eq!(
            "eval".parse::<ProcSpec>().unwrap(),
            ProcSpec {
                proc_name: "eval".into(),
                arguments: vec![],
            }
        );
        assert!(":lr=1".parse::<ProcSpec>().is_err());
        assert!("train:lr".parse::<ProcSpec>().is_err());
        assert!("train:=1".parse::<ProcSpec>().is_err());
    }

    #[test]
    fn new_run_arguments_keep_order() {
        let cli = Cli::try_parse_from([
            "simpyl-cli",
            "new-run",
            "-d",
            "sweep",
            "--proc",
            "load",
            "--proc",
            "train:lr=0.1",
            "--env",
            "gpu",
        ])
        .unwrap();
        let Command::NewRun(a) = cli.command else {
            panic!("expected new-run");
        };
        assert_eq!(a.description, "sweep");
        assert_eq!(a.environment.as_deref(), Some("gpu"));
        let names: Vec<_> = a.procs.iter().map(|p| p.proc_name.as_str()).collect();
        assert_eq!(names, vec!["load", "train"]);
    }

    #[test]
    fn run_id_from_flag_or_location() {
        let parse = |argv: &[&str]| {
            let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
            match cli.command {
                Command::Run(r) => r.run_id(),
                _ => panic!("expected run"),
            }
        };
        assert_eq!(parse(&["simpyl-cli", "run", "--runid", "4"]), RunId::new("4"));
        assert_eq!(
            parse(&["simpyl-cli", "run", "--location", "http://h/rundetail?runid=7"]),
            RunId::new("7")
        );
        assert_eq!(parse(&["simpyl-cli", "run"]), None);
        assert!(Cli::try_parse_from(["simpyl-cli", "run", "--runid", "1", "--location", "?runid=2"])
            .is_err());
    }

    #[test]
    fn global_flags_feed_client_config() {
        let cli = Cli::try_parse_from([
            "simpyl-cli",
            "runs",
            "--base-url",
            "http://runs.lab:8000",
            "--timeout",
            "5s",
        ])
        .unwrap();
        let cfg = build_config(&cli, &FileConfig::default());
        assert_eq!(cfg.base_url, "http://runs.lab:8000");
        assert_eq!(cfg.timeout, std::time::Duration::from_secs(5));
    }
}
