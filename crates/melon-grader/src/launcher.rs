//! Bringing candidates up and tearing them down.
//!
//! Every load builds a brand new server: a fresh `ubermelon` state for
//! builtin candidates, a freshly spawned process for command candidates. No
//! melon counts or sessions survive from one candidate to the next.
//!
//! The server is stopped when the [`LoadedCandidate`] is shut down or dropped,
//! whichever comes first, including when loading fails halfway.

use std::net::{Ipv4Addr, SocketAddr};
use std::process::Stdio;
use std::time::Instant;

use reqwest::redirect::Policy;
use reqwest::Url;
use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::candidate::CandidateDescriptor;
use crate::client::CandidateClient;
use crate::config::GraderConfig;
use crate::error::LoadError;
use crate::manifest::{CandidateManifest, LaunchSpec};
use crate::obs;
use ubermelon::{AppConfig, AppState};

/// Environment variable carrying the port a command candidate must bind.
pub const PORT_ENV: &str = "PORT";

/// Environment variable switching a command candidate into testing mode.
pub const TESTING_ENV: &str = "UBERMELON_TESTING";

enum ServerHandle {
    InProcess(JoinHandle<std::io::Result<()>>),
    Process(Child),
    Attached,
}

impl ServerHandle {
    fn kind(&self) -> &'static str {
        match self {
            ServerHandle::InProcess(_) => "builtin",
            ServerHandle::Process(_) => "command",
            ServerHandle::Attached => "attached",
        }
    }

    /// `Some(reason)` once the server is gone.
    fn exited(&mut self) -> Option<String> {
        match self {
            ServerHandle::InProcess(task) => task
                .is_finished()
                .then(|| "builtin server stopped".to_string()),
            ServerHandle::Process(child) => match child.try_wait() {
                Ok(Some(status)) => Some(status.to_string()),
                Ok(None) => None,
                Err(e) => Some(e.to_string()),
            },
            ServerHandle::Attached => None,
        }
    }

    async fn stop(&mut self) {
        match self {
            ServerHandle::InProcess(task) => task.abort(),
            ServerHandle::Process(child) => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "candidate process already gone");
                }
            }
            ServerHandle::Attached => {}
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        match self {
            ServerHandle::InProcess(task) => task.abort(),
            ServerHandle::Process(child) => {
                let _ = child.start_kill();
            }
            ServerHandle::Attached => {}
        }
    }
}

/// A running candidate and the client bound to it.
pub struct LoadedCandidate {
    descriptor: CandidateDescriptor,
    client: CandidateClient,
    server: ServerHandle,
}

impl LoadedCandidate {
    /// Bind to a server someone else started. Shutdown leaves it running.
    pub fn attach(descriptor: CandidateDescriptor, base: Url) -> Result<Self, LoadError> {
        Ok(Self {
            descriptor,
            client: CandidateClient::new(base)?,
            server: ServerHandle::Attached,
        })
    }

    pub fn descriptor(&self) -> &CandidateDescriptor {
        &self.descriptor
    }

    pub fn client(&self) -> &CandidateClient {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        self.client.base_url()
    }

    pub fn kind(&self) -> &'static str {
        self.server.kind()
    }

    /// Stop the server and wait for it to go away.
    pub async fn shutdown(mut self) {
        self.server.stop().await;
    }
}

/// Load a candidate according to its manifest.
pub async fn load_candidate(
    descriptor: &CandidateDescriptor,
    config: &GraderConfig,
) -> Result<LoadedCandidate, LoadError> {
    let manifest = CandidateManifest::load(&descriptor.path, &config.manifest_file)?;

    let (server, base) = match manifest.launch_spec()? {
        LaunchSpec::Builtin => launch_builtin().await?,
        LaunchSpec::Command { program, args, env } => {
            let port = reserve_port()?;
            let mut command = Command::new(&program);
            command
                .args(&args)
                .envs(&env)
                .env(PORT_ENV, port.to_string())
                .env(TESTING_ENV, "1")
                .current_dir(&descriptor.path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true);
            let child = command
                .spawn()
                .map_err(|source| LoadError::Spawn { program, source })?;
            (ServerHandle::Process(child), base_url(port)?)
        }
    };

    let mut loaded = LoadedCandidate {
        descriptor: descriptor.clone(),
        client: CandidateClient::new(base)?,
        server,
    };
    wait_ready(&mut loaded, config).await?;
    obs::emit_candidate_loaded(&descriptor.name, loaded.kind(), loaded.base_url().as_str());
    Ok(loaded)
}

/// Serve a fresh reference app on an ephemeral loopback port.
async fn launch_builtin() -> Result<(ServerHandle, Url), LoadError> {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .map_err(LoadError::Bind)?;
    let port = listener.local_addr().map_err(LoadError::Bind)?.port();
    let state = AppState::new(AppConfig::testing());
    let task = tokio::spawn(ubermelon::serve(listener, state));
    Ok((ServerHandle::InProcess(task), base_url(port)?))
}

/// Pick a free loopback port for a child process to bind.
fn reserve_port() -> Result<u16, LoadError> {
    let listener = std::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .map_err(LoadError::Bind)?;
    let port = listener.local_addr().map_err(LoadError::Bind)?.port();
    Ok(port)
}

fn base_url(port: u16) -> Result<Url, LoadError> {
    let raw = format!("http://{}:{}/", Ipv4Addr::LOCALHOST, port);
    Url::parse(&raw).map_err(|e| LoadError::BaseUrl(format!("{}: {}", raw, e)))
}

/// Poll `GET /` until the server answers anything at all.
///
/// Uses its own cookie-less client so polling cannot touch the candidate's session.
async fn wait_ready(loaded: &mut LoadedCandidate, config: &GraderConfig) -> Result<(), LoadError> {
    let poller = reqwest::Client::builder()
        .redirect(Policy::none())
        .timeout(config.startup_timeout())
        .build()?;
    let url = loaded.base_url().clone();
    let deadline = Instant::now() + config.startup_timeout();

    loop {
        if let Some(reason) = loaded.server.exited() {
            return Err(LoadError::ExitedEarly(reason));
        }
        match poller.get(url.clone()).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "candidate ready");
                return Ok(());
            }
            Err(e) => debug!(error = %e, "candidate not ready yet"),
        }
        if Instant::now() >= deadline {
            return Err(LoadError::NotReady(config.startup_timeout_secs));
        }
        tokio::time::sleep(config.poll_interval()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn candidate_with_manifest(manifest: &str) -> (tempfile::TempDir, CandidateDescriptor) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("candidate.toml"), manifest).unwrap();
        let descriptor = CandidateDescriptor::new("fixture", dir.path());
        (dir, descriptor)
    }

    fn quick_config() -> GraderConfig {
        GraderConfig {
            startup_timeout_secs: 1,
            poll_interval_ms: 20,
            ..GraderConfig::default()
        }
    }

    #[test]
    fn test_base_url() {
        assert_eq!(base_url(5000).unwrap().as_str(), "http://127.0.0.1:5000/");
    }

    #[test]
    fn test_reserve_port_nonzero() {
        assert_ne!(reserve_port().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_builtin_candidate_answers() {
        let (_dir, descriptor) = candidate_with_manifest("[server]\nbuiltin = true\n");
        let loaded = load_candidate(&descriptor, &quick_config()).await.unwrap();
        assert_eq!(loaded.kind(), "builtin");

        let page = loaded.client().get("/").await.unwrap();
        assert_eq!(page.status, 200);
        assert!(page.body.contains("/get-name"));
        loaded.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = CandidateDescriptor::new("empty", dir.path());
        let err = load_candidate(&descriptor, &quick_config()).await.err().unwrap();
        assert!(matches!(err, LoadError::ManifestMissing(_)));
    }

    #[tokio::test]
    async fn test_unknown_program() {
        let (_dir, descriptor) =
            candidate_with_manifest("[server]\ncommand = [\"melon-grader-no-such-binary\"]\n");
        let err = load_candidate(&descriptor, &quick_config()).await.err().unwrap();
        assert!(matches!(err, LoadError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_process_exiting_early() {
        let (_dir, descriptor) = candidate_with_manifest("[server]\ncommand = [\"false\"]\n");
        let err = load_candidate(&descriptor, &quick_config()).await.err().unwrap();
        assert!(matches!(err, LoadError::ExitedEarly(_)));
    }

    #[tokio::test]
    async fn test_process_never_listening() {
        let (_dir, descriptor) =
            candidate_with_manifest("[server]\ncommand = [\"sleep\", \"30\"]\n");
        let err = load_candidate(&descriptor, &quick_config()).await.err().unwrap();
        assert!(matches!(err, LoadError::NotReady(1)));
    }
}
