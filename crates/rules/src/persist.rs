//! JSON policy files: one per scope.
//!
//! - global:  `<user config dir>/weave/policy.json`
//! - project: `<project dir>/.weave/policy.json`
//!
//! A missing file is an empty scope. A malformed file is an error rather than
//! an empty scope, so that a subsequent save cannot silently overwrite it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{PolicyError, Result};
use crate::rule::Scope;
use crate::store::{RuleStore, ScopeRules};

const APP_DIR: &str = "weave";
const PROJECT_DIR: &str = ".weave";
const POLICY_FILE: &str = "policy.json";

/// Locations of the two policy files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyPaths {
    pub global: PathBuf,
    pub project: PathBuf,
}

impl PolicyPaths {
    /// Default locations for a given project directory.
    pub fn discover(project_dir: &Path) -> Result<Self> {
        let global = dirs::config_dir()
            .ok_or(PolicyError::NoConfigDir)?
            .join(APP_DIR)
            .join(POLICY_FILE);
        Ok(Self {
            global,
            project: Self::project_file(project_dir),
        })
    }

    /// Policy file path inside a project directory.
    pub fn project_file(project_dir: &Path) -> PathBuf {
        project_dir.join(PROJECT_DIR).join(POLICY_FILE)
    }

    pub fn path_for(&self, scope: Scope) -> &Path {
        match scope {
            Scope::Global => &self.global,
            Scope::Project => &self.project,
        }
    }
}

impl ScopeRules {
    /// Read one scope's policy file. Missing file yields an empty scope.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "policy file not found, using empty scope");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write one scope's policy file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")?;
        info!(path = %path.display(), "policy file written");
        Ok(())
    }
}

impl RuleStore {
    /// Load both scopes.
    pub fn load(paths: &PolicyPaths) -> Result<Self> {
        let global = ScopeRules::load(&paths.global)?;
        let project = ScopeRules::load(&paths.project)?;
        Ok(Self::from_scopes(global, project))
    }

    /// Persist one scope after a mutation.
    pub fn save(&self, scope: Scope, paths: &PolicyPaths) -> Result<()> {
        self.scope(scope).save(paths.path_for(scope))
    }
}
