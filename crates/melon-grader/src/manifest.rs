//! Candidate manifest (`candidate.toml`).
//!
//! ```toml
//! [server]
//! # Serve with the reference UberMelon build:
//! builtin = true
//!
//! # ...or run the submission's own server. It must listen on $PORT.
//! # command = ["python3", "server.py"]
//! # env = { FLASK_ENV = "testing" }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Parsed manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CandidateManifest {
    pub server: ServerSection,
}

/// `[server]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default)]
    pub builtin: bool,

    /// Command to execute (first element is executable).
    #[serde(default)]
    pub command: Vec<String>,

    /// Extra environment for the command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// How to bring a candidate's server up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchSpec {
    /// Serve a fresh reference app in-process.
    Builtin,

    /// Spawn the candidate's own server inside its directory.
    Command {
        program: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
}

impl CandidateManifest {
    /// Read `file_name` from the candidate directory.
    pub fn load(candidate_dir: &Path, file_name: &str) -> Result<Self, LoadError> {
        let path = candidate_dir.join(file_name);
        if !path.is_file() {
            return Err(LoadError::ManifestMissing(path));
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|source| LoadError::ManifestInvalid { path, source })
    }

    /// Decide how to launch. Exactly one of `builtin` / `command` must be set.
    pub fn launch_spec(&self) -> Result<LaunchSpec, LoadError> {
        let server = &self.server;
        match (server.builtin, server.command.split_first()) {
            (true, None) => Ok(LaunchSpec::Builtin),
            (false, Some((program, args))) => Ok(LaunchSpec::Command {
                program: program.clone(),
                args: args.to_vec(),
                env: server.env.clone(),
            }),
            (true, Some(_)) => Err(LoadError::InvalidLaunch(
                "set either `builtin` or `command`, not both".to_string(),
            )),
            (false, None) => Err(LoadError::InvalidLaunch(
                "no server configured: set `builtin = true` or `command`".to_string(),
            )),
        }
    }
}
