use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Environment used when a run does not name one.
pub const DEFAULT_ENVIRONMENT: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessArgument {
    pub name: String,
    // The backend converts numeric strings on its side, so values may come back as numbers.
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
}

impl ProcessArgument {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A process template from the catalog, or the working selection being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInit {
    pub proc_name: String,
    #[serde(default)]
    pub arguments: Vec<ProcessArgument>,
}

impl ProcessInit {
    pub fn is_empty(&self) -> bool {
        self.proc_name.is_empty()
    }
}

/// Render arguments as `name:value` pairs joined by `", "`.
pub fn format_arguments(arguments: &[ProcessArgument]) -> String {
    arguments
        .iter()
        .map(|a| format!("{}:{}", a.name, a.value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A process invocation committed into a run definition.
///
/// Entries are only created through [`RunProcessEntry::snapshot`], which copies the
/// working invocation and fixes its `run_order` and `arguments_str`. Fields are
/// read-only outside this module so a committed entry cannot be renumbered or edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProcessEntry {
    proc_name: String,
    run_order: usize,
    arguments: Vec<ProcessArgument>,
    arguments_str: String,
}

impl RunProcessEntry {
    /// Deep-copy `working` into a new entry at position `run_order`.
    pub(crate) fn snapshot(working: &ProcessInit, run_order: usize) -> Self {
        let arguments = working
            .arguments
            .iter()
            .map(|a| ProcessArgument {
                name: a.name.clone(),
                value: a.value.clone(),
            })
            .collect::<Vec<_>>();
        Self {
            proc_name: working.proc_name.clone(),
            run_order,
            arguments_str: format_arguments(&arguments),
            arguments,
        }
    }

    pub fn proc_name(&self) -> &str {
        &self.proc_name
    }

    pub fn run_order(&self) -> usize {
        self.run_order
    }

    #[cfg(test)]
    pub fn arguments(&self) -> &[ProcessArgument] {
        &self.arguments
    }

    pub fn arguments_str(&self) -> &str {
        &self.arguments_str
    }
}

/// Body of `POST api/newrun`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInit {
    pub description: String,
    pub environment_name: String,
    pub proc_inits: Vec<RunProcessEntry>,
}

impl Default for RunInit {
    fn default() -> Self {
        Self {
            description: String::new(),
            environment_name: DEFAULT_ENVIRONMENT.to_string(),
            proc_inits: Vec::new(),
        }
    }
}

/// Run identifier as it appears in the `runid` query parameter and in API paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Returns `None` for blank input.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Read the `runid` query parameter from a page location.
    ///
    /// Accepts a full URL (`http://host/rundetail?runid=3`), a path with a query
    /// (`/rundetail?runid=3`) or a bare query string (`?runid=3`, `runid=3`).
    /// A missing or empty parameter yields `None`.
    pub fn from_location(location: &str) -> Option<Self> {
        let location = location.trim();
        let location = if location.contains("://") || location.contains('?') {
            location.to_string()
        } else {
            format!("?{location}")
        };
        let base = reqwest::Url::parse("http://location.invalid/").ok()?;
        let url = base.join(&location).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "runid")
            .and_then(|(_, v)| Self::new(v.into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for RunId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of an executed run, as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default)]
    pub environment_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    /// Seconds since the epoch; `None` while the run has not started/stopped.
    #[serde(default)]
    pub timestamp_start: Option<f64>,
    #[serde(default)]
    pub timestamp_stop: Option<f64>,
    #[serde(default)]
    pub proc_results: Vec<ProcResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcResult {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub proc_name: String,
    #[serde(default)]
    pub run_order: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub result: String,
    #[serde(default)]
    pub arguments: Vec<ProcessArgument>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub arguments_str: String,
    #[serde(default)]
    pub timestamp_start: Option<f64>,
    #[serde(default)]
    pub timestamp_stop: Option<f64>,
}

// Response envelopes.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcInitsResponse {
    #[serde(default)]
    pub proc_inits: Vec<ProcessInit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentsResponse {
    #[serde(default)]
    pub environment_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnvironment {
    pub environment_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunsResponse {
    #[serde(default)]
    pub run_results: Vec<RunResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub run_result: RunResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub log: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiguresResponse {
    #[serde(default)]
    pub figures: Vec<String>,
}

/// File name of a figure reference (the last path segment of its URL).
pub fn figure_name(reference: &str) -> &str {
    let path = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference)
        .trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

/// Accept strings, numbers, booleans and null where the backend is loose about types.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arguments_are_joined_in_order() {
        let args = vec![ProcessArgument::new("a", "1"), ProcessArgument::new("b", "2")];
        assert_eq!(format_arguments(&args), "a:1, b:2");
        assert_eq!(format_arguments(&[]), "");
    }

    #[test]
    fn snapshot_copies_arguments_and_fixes_derived_fields() {
        let mut working = ProcessInit {
            proc_name: "train".into(),
            arguments: vec![ProcessArgument::new("lr", "0.1")],
        };
        let entry = RunProcessEntry::snapshot(&working, 3);
        working.arguments[0].value = "0.5".into();

        assert_eq!(entry.proc_name(), "train");
        assert_eq!(entry.run_order(), 3);
        assert_eq!(entry.arguments(), &[ProcessArgument::new("lr", "0.1")]);
        assert_eq!(entry.arguments_str(), "lr:0.1");
    }

    #[test]
    fn run_init_serializes_wire_shape() {
        let working = ProcessInit {
            proc_name: "train".into(),
            arguments: vec![ProcessArgument::new("lr", "0.1")],
        };
        let run = RunInit {
            description: "first".into(),
            proc_inits: vec![RunProcessEntry::snapshot(&working, 0)],
            ..Default::default()
        };
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "description": "first",
                "environment_name": "default",
                "proc_inits": [{
                    "proc_name": "train",
                    "run_order": 0,
                    "arguments": [{"name": "lr", "value": "0.1"}],
                    "arguments_str": "lr:0.1"
                }]
            })
        );
    }

    #[test]
    fn run_result_tolerates_loose_backend_types() {
        let raw = serde_json::json!({
            "id": 7,
            "description": null,
            "status": "complete",
            "timestamp_start": 1000000000.25,
            "timestamp_stop": null,
            "extra": "ignored",
            "proc_results": [{
                "proc_name": "fit",
                "result": 42,
                "arguments": [{"name": "a", "value": 1}],
                "timestamp_start": 1000000000
            }]
        });
        let run: RunResult = serde_json::from_value(raw).unwrap();
        assert_eq!(run.id, Some(7));
        assert_eq!(run.description, "");
        assert_eq!(run.timestamp_stop, None);
        assert_eq!(run.proc_results[0].result, "42");
        assert_eq!(run.proc_results[0].arguments[0].value, "1");
        assert_eq!(run.proc_results[0].timestamp_start, Some(1_000_000_000.0));
    }

    #[test]
    fn null_proc_name_keeps_the_rest_of_the_listing() {
        let runs: RunsResponse = serde_json::from_str(
            r#"{"run_results":[{"id":1,"proc_results":[{"proc_name":null,"result":"x"}]},{"id":2,"proc_results":[]}]}"#,
        )
        .unwrap();
        assert_eq!(runs.run_results.len(), 2);
        assert_eq!(runs.run_results[0].proc_results[0].proc_name, "");
        assert_eq!(runs.run_results[0].proc_results[0].result, "x");
        assert_eq!(runs.run_results[1].id, Some(2));

        let missing: ProcResult = serde_json::from_str(r#"{"result":"ok"}"#).unwrap();
        assert_eq!(missing.proc_name, "");
    }

    #[test]
    fn run_id_is_read_from_location() {
        assert_eq!(
            RunId::from_location("http://localhost:5000/rundetail?runid=12"),
            RunId::new("12")
        );
        assert_eq!(RunId::from_location("/rundetail?x=1&runid=4"), RunId::new("4"));
        assert_eq!(RunId::from_location("?runid=5"), RunId::new("5"));
        assert_eq!(RunId::from_location("runid=6"), RunId::new("6"));
        assert_eq!(RunId::from_location("http://localhost:5000/rundetail"), None);
        assert_eq!(RunId::from_location("?runid="), None);
        assert_eq!(RunId::new("  "), None);
    }

    #[test]
    fn figure_name_is_last_segment() {
        assert_eq!(
            figure_name("http://localhost:5000/api/figure/3/fit_loss.png"),
            "fit_loss.png"
        );
        assert_eq!(figure_name("plot.svg"), "plot.svg");
    }
}
