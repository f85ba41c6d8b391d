use super::{ApiError, Backend, SubmitReceipt};
use crate::config::ClientConfig;
use crate::model::{
    EnvironmentsResponse, FiguresResponse, LogResponse, NewEnvironment, ProcInitsResponse,
    ProcessInit, RunId, RunInit, RunResponse, RunResult, RunsResponse,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// `reqwest`-backed client for a simpyl server.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&cfg.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", cfg.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(cfg.base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .user_agent(&cfg.user_agent)
            .timeout(cfg.timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, req: reqwest::RequestBuilder, url: &Url) -> Result<reqwest::Response, ApiError> {
        req.send().await.map_err(|e| ApiError::transport(url, e))
    }

    async fn read_ok(&self, resp: reqwest::Response, url: &Url) -> Result<Bytes, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.bytes().await.map_err(|e| ApiError::transport(url, e))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "GET");
        let resp = self.send(self.http.get(url.clone()), &url).await?;
        let body = self.read_ok(resp, &url).await?;
        decode(&url, &body)
    }

    /// POST `body` as JSON. Any HTTP status is returned as-is, with the URL it was sent to.
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<(Url, u16, Bytes), ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "POST");
        let resp = self.send(self.http.post(url.clone()).json(body), &url).await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| ApiError::transport(&url, e))?;
        Ok((url, status, bytes))
    }
}

fn decode<T: DeserializeOwned>(url: &Url, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Pull a run id out of whatever the backend returned for a new run.
fn receipt_run_id(body: &[u8]) -> Option<RunId> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let id = value
        .get("id")
        .or_else(|| value.get("run_result").and_then(|r| r.get("id")))?;
    match id {
        serde_json::Value::Number(n) => RunId::new(n.to_string()),
        serde_json::Value::String(s) => RunId::new(s.clone()),
        _ => None,
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn proc_inits(&self) -> Result<Vec<ProcessInit>, ApiError> {
        let resp: ProcInitsResponse = self.get_json(&["api", "proc_inits"]).await?;
        Ok(resp.proc_inits)
    }

    async fn environment_names(&self) -> Result<Vec<String>, ApiError> {
        let resp: EnvironmentsResponse = self.get_json(&["api", "envs"]).await?;
        Ok(resp.environment_names)
    }

    async fn create_environment(&self, name: &str) -> Result<String, ApiError> {
        let (url, status, body) = self
            .post_json(
                &["api", "newenv"],
                &NewEnvironment {
                    environment_name: name.to_string(),
                },
            )
            .await?;
        if !(200..300).contains(&status) {
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
            });
        }
        let created: NewEnvironment = decode(&url, &body)?;
        Ok(created.environment_name)
    }

    async fn submit_run(&self, run: &RunInit) -> Result<SubmitReceipt, ApiError> {
        let (_, status, body) = self.post_json(&["api", "newrun"], run).await?;
        if !(200..300).contains(&status) {
            tracing::warn!(status, "backend replied to new run with a non-success status");
        }
        Ok(SubmitReceipt {
            status,
            run_id: receipt_run_id(&body),
        })
    }

    async fn run_results(&self) -> Result<Vec<RunResult>, ApiError> {
        // The listing endpoint is registered with a trailing slash.
        let resp: RunsResponse = self.get_json(&["api", "runs", ""]).await?;
        Ok(resp.run_results)
    }

    async fn run_result(&self, id: &RunId) -> Result<RunResult, ApiError> {
        let resp: RunResponse = self.get_json(&["api", "run", id.as_str()]).await?;
        Ok(resp.run_result)
    }

    async fn log(&self, id: &RunId) -> Result<String, ApiError> {
        let resp: LogResponse = self.get_json(&["api", "log", id.as_str()]).await?;
        Ok(resp.log)
    }

    async fn figures(&self, id: &RunId) -> Result<Vec<String>, ApiError> {
        let resp: FiguresResponse = self.get_json(&["api", "figures", id.as_str()]).await?;
        Ok(resp.figures)
    }

    async fn fetch_figure(&self, id: &RunId, name: &str) -> Result<Bytes, ApiError> {
        let url = self.endpoint(&["api", "figure", id.as_str(), name])?;
        tracing::debug!(%url, "GET");
        let resp = self.send(self.http.get(url.clone()), &url).await?;
        self.read_ok(resp, &url).await
    }
}
