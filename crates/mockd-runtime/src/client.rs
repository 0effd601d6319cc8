//! The control-plane client: register, heartbeat, apply commands, pull.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use mockd_core::{Deployment, MockdUri};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::DeploymentCache;
use crate::error::{RuntimeError, RuntimeResult};
use crate::index::DeploymentIndex;
use crate::wire::{
    Command, HeartbeatRequest, HeartbeatResponse, PullResponse, PulledCollection,
    RegisterRequest, RegisterResponse,
};

/// Runtime client configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Control-plane base URL.
    pub control_plane_url: String,
    /// Name this runtime registers under.
    pub name: String,
    /// URL the control plane can reach this runtime at.
    pub advertise_url: String,
    pub labels: BTreeMap<String, String>,
    pub heartbeat_interval: Duration,
    pub http_timeout: Duration,
    /// Initial auth token; a rotated token from registration replaces it.
    pub auth_token: Option<String>,
    /// Version string reported in heartbeats.
    pub version: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            control_plane_url: "http://localhost:8080".into(),
            name: "mockd-runtime".into(),
            advertise_url: "http://localhost:4000".into(),
            labels: BTreeMap::new(),
            heartbeat_interval: Duration::from_secs(30),
            http_timeout: Duration::from_secs(10),
            auth_token: None,
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Long-lived control-plane client. Owns the deployment index and keeps
/// the disk cache in sync with it.
#[derive(Debug)]
pub struct RuntimeClient {
    http: reqwest::Client,
    config: RuntimeConfig,
    runtime_id: RwLock<Option<String>>,
    token: RwLock<Option<String>>,
    index: Arc<DeploymentIndex>,
    cache: Option<DeploymentCache>,
}

impl RuntimeClient {
    pub fn new(config: RuntimeConfig, cache: Option<DeploymentCache>) -> RuntimeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| RuntimeError::Decode(e.to_string()))?;
        let token = RwLock::new(config.auth_token.clone());
        Ok(Self {
            http,
            config,
            runtime_id: RwLock::new(None),
            token,
            index: Arc::new(DeploymentIndex::new()),
            cache,
        })
    }

    pub fn index(&self) -> Arc<DeploymentIndex> {
        Arc::clone(&self.index)
    }

    pub fn runtime_id(&self) -> Option<String> {
        self.runtime_id.read().clone()
    }

    /// Populate the index from the disk cache, for offline starts.
    pub fn load_cache(&self) -> RuntimeResult<usize> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };
        let deployments = cache.load_all()?;
        let count = deployments.len();
        self.index.replace_all(deployments);
        if count > 0 {
            info!(count, "restored deployments from cache");
        }
        Ok(count)
    }

    /// Register with the control plane. Success requires 201; the
    /// returned id (and rotated token, if any) are adopted atomically.
    pub async fn register(&self) -> RuntimeResult<RegisterResponse> {
        let request = RegisterRequest {
            name: self.config.name.clone(),
            url: self.config.advertise_url.clone(),
            labels: self.config.labels.clone(),
        };

        let response = self
            .request(reqwest::Method::POST, "/api/v1/runtimes/register")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            return Err(RuntimeError::Status {
                status: status.as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }

        let registered: RegisterResponse = response
            .json()
            .await
            .map_err(|e| RuntimeError::Decode(e.to_string()))?;

        {
            let mut id = self.runtime_id.write();
            let mut token = self.token.write();
            *id = Some(registered.id.clone());
            if let Some(rotated) = &registered.token {
                *token = Some(rotated.clone());
            }
        }

        info!(id = %registered.id, name = %registered.name, "registered with control plane");
        Ok(registered)
    }

    /// One heartbeat: report status, then apply any returned commands
    /// sequentially.
    pub async fn heartbeat(&self) -> RuntimeResult<usize> {
        let id = self.runtime_id().ok_or(RuntimeError::NotRegistered)?;

        let request = HeartbeatRequest {
            status: "healthy".into(),
            version: self.config.version.clone(),
            deployments: self.index.summaries(),
        };

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/api/v1/runtimes/{id}/heartbeat"),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::Status {
                status: status.as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }

        let heartbeat: HeartbeatResponse = response
            .json()
            .await
            .map_err(|e| RuntimeError::Decode(e.to_string()))?;

        let count = heartbeat.commands.len();
        self.process_commands(heartbeat.commands);
        Ok(count)
    }

    /// Heartbeat until the cancellation token fires. Transient failures
    /// are logged and retried on the next tick; they never stop the loop.
    pub async fn heartbeat_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("heartbeat loop stopped");
                    return;
                }
                _ = ticker.tick() => {
                    match self.heartbeat().await {
                        Ok(commands) if commands > 0 => {
                            debug!(commands, "heartbeat applied commands");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "heartbeat failed, will retry"),
                    }
                }
            }
        }
    }

    /// Apply commands in order. A failing command is logged; the rest
    /// still run.
    fn process_commands(&self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Deploy {
                    deployment_id,
                    mock_id,
                    mock_version,
                    url_path,
                    content,
                } => {
                    let deployment =
                        Deployment::new(deployment_id, mock_id, mock_version, url_path, content);
                    info!(id = %deployment.id, path = %deployment.url_path, "applying deploy");

                    let evicted = self.index.insert(deployment.clone());
                    if let Some(cache) = &self.cache {
                        if let Some(previous) = evicted {
                            if let Err(e) = cache.remove(&previous.id) {
                                warn!(id = %previous.id, error = %e, "failed to drop evicted cache entry");
                            }
                        }
                        if let Err(e) = cache.store(&deployment) {
                            warn!(id = %deployment.id, error = %e, "failed to cache deployment");
                        }
                    }
                }
                Command::Undeploy { deployment_id } => {
                    // unknown ids are silently ignored; undeploy is idempotent
                    match self.index.remove(&deployment_id) {
                        Some(removed) => {
                            info!(id = %removed.id, path = %removed.url_path, "applying undeploy");
                            if let Some(cache) = &self.cache
                                && let Err(e) = cache.remove(&deployment_id)
                            {
                                warn!(id = %deployment_id, error = %e, "failed to drop cache entry");
                            }
                        }
                        None => debug!(id = %deployment_id, "undeploy for unknown deployment"),
                    }
                }
            }
        }
    }

    /// Atomically replace the index (and cache) from the control plane's
    /// full deployment listing.
    pub async fn pull_deployments(&self) -> RuntimeResult<usize> {
        let id = self.runtime_id().ok_or(RuntimeError::NotRegistered)?;

        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/api/v1/runtimes/{id}/deployments"),
            )
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::Status {
                status: status.as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }

        let pulled: PullResponse = response
            .json()
            .await
            .map_err(|e| RuntimeError::Decode(e.to_string()))?;

        let deployments: Vec<Deployment> = pulled
            .deployments
            .into_iter()
            .map(|d| Deployment::new(d.id, d.mock_id, d.version, d.url_path, d.content))
            .collect();
        let count = deployments.len();

        if let Some(cache) = &self.cache
            && let Err(e) = cache.replace_all(&deployments)
        {
            warn!(error = %e, "failed to rewrite deployment cache");
        }
        self.index.replace_all(deployments);

        info!(count, "pulled deployments");
        Ok(count)
    }

    /// Fetch one collection by `mockd://` URI. A 404 is `None`.
    pub async fn pull_by_uri(&self, uri: &MockdUri) -> RuntimeResult<Option<PulledCollection>> {
        let response = self
            .request(reqwest::Method::GET, "/api/v1/pull")
            .query(&[("uri", uri.to_string())])
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RuntimeError::Status {
                status: status.as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| RuntimeError::Decode(e.to_string()))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "{}{path}",
            self.config.control_plane_url.trim_end_matches('/')
        );
        let mut builder = self.http.request(method, url);
        let token = self.token.read().clone();
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn transport_error(&self, error: &reqwest::Error) -> RuntimeError {
        let mut detail = error.to_string();
        let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(error);
        while let Some(inner) = source {
            detail = inner.to_string();
            source = inner.source();
        }
        RuntimeError::Unreachable {
            url: self.config.control_plane_url.clone(),
            detail,
        }
    }
}
