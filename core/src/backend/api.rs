use crate::feed::DashboardSnapshot;
use crate::{AgisError, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Result of the readiness probe
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
}

#[derive(Debug, Deserialize)]
struct ProbeBody {
    status: String,
}

/// HTTP client for the backend's JSON endpoints
#[derive(Clone, Debug)]
pub struct BackendApi {
    base: Url,
    http: reqwest::Client,
}

impl BackendApi {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base)
            .map_err(|e| AgisError::InvalidEndpoint(format!("{}: {}", base, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| AgisError::InvalidEndpoint(format!("{}: {}", path, e)))
    }

    /// Liveness probe; succeeds when the backend answers `{"status": "ok"}`
    pub async fn healthz(&self) -> Result<()> {
        let url = self.endpoint("healthz")?;
        let resp = self.http.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(AgisError::Backend(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }
        let body: ProbeBody = resp.json().await?;
        if body.status != "ok" {
            return Err(AgisError::Backend(format!(
                "{} reported status '{}'",
                url, body.status
            )));
        }
        Ok(())
    }

    /// Readiness probe; 503 means "still starting", not an error
    pub async fn readyz(&self) -> Result<Readiness> {
        let url = self.endpoint("readyz")?;
        let resp = self.http.get(url.clone()).send().await?;
        match resp.status() {
            StatusCode::SERVICE_UNAVAILABLE => Ok(Readiness::NotReady),
            s if s.is_success() => {
                let body: ProbeBody = resp.json().await?;
                debug!(target: "backend_api", status = %body.status, "Readiness probe");
                Ok(if body.status == "ready" {
                    Readiness::Ready
                } else {
                    Readiness::NotReady
                })
            }
            s => Err(AgisError::Backend(format!("{} returned {}", url, s))),
        }
    }

    /// Fetch the dashboard snapshot
    pub async fn dashboard(&self) -> Result<DashboardSnapshot> {
        let url = self.endpoint("api/dashboard")?;
        let resp = self.http.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(AgisError::Backend(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }
}
