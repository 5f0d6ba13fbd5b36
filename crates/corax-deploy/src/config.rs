// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use crate::plan::EngineSettings;
use crate::signature::{DEFAULT_MAX_AGE_SECS, Validator};

/// Default pipeline file committed to new projects.
pub const DEFAULT_INCLUDE_FILE: &str = ".gitlab-ci.yml";
/// Default ref of the central pipeline project.
pub const DEFAULT_INCLUDE_REF: &str = "main";

/// GitLab connection and pipeline include settings.
#[derive(Clone, Default)]
pub struct GitlabSettings {
    pub url: Option<String>,
    pub token: Option<String>,
    /// Group new projects are created in.
    pub group_id: Option<u64>,
    /// Central project holding the pipeline templates.
    pub include_project: Option<String>,
    pub include_file: String,
    pub include_ref: String,
}

impl std::fmt::Debug for GitlabSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitlabSettings")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("group_id", &self.group_id)
            .field("include_project", &self.include_project)
            .field("include_file", &self.include_file)
            .field("include_ref", &self.include_ref)
            .finish()
    }
}

impl GitlabSettings {
    /// URL and token, both required before talking to GitLab.
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .url
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("GITLAB_URL"))?;
        let token = self
            .token
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("GITLAB_TOKEN"))?;
        Ok((url, token))
    }

    pub fn require_group_id(&self) -> Result<u64, ConfigError> {
        self.group_id.ok_or(ConfigError::Missing("GITLAB_GROUP_ID"))
    }
}

/// Corax deploy configuration
#[derive(Clone)]
pub struct Settings {
    /// Bot secret used to verify signed web-app payloads.
    pub bot_token: Option<String>,
    /// Maximum accepted payload age in seconds.
    pub auth_max_age_secs: i64,
    pub gitlab: GitlabSettings,
    pub engine: EngineSettings,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("auth_max_age_secs", &self.auth_max_age_secs)
            .field("gitlab", &self.gitlab)
            .field("engine", &self.engine)
            .finish()
    }
}

impl Settings {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `BOT_TOKEN` (or legacy `TOKEN`): bot secret for payload validation
    /// - `AUTH_MAX_AGE_SECS`: payload expiry window (default: 86400)
    /// - `GITLAB_URL`, `GITLAB_TOKEN`: GitLab instance and access token
    /// - `GITLAB_GROUP_ID`: numeric group for new projects
    /// - `GITLAB_INCLUDE_PROJECT`: central pipeline project
    /// - `GITLAB_INCLUDE_FILE`: pipeline file name (default: .gitlab-ci.yml)
    /// - `GITLAB_INCLUDE_REF`: central project ref (default: main)
    /// - `ENGINE_REPO`, `ENGINE_TEMP_DIR`, `CI_JOB_TOKEN`: engine checkout settings
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let bot_token = non_empty("BOT_TOKEN").or_else(|| non_empty("TOKEN"));

        let auth_max_age_secs: i64 = match non_empty("AUTH_MAX_AGE_SECS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid(
                    "AUTH_MAX_AGE_SECS",
                    "must be a positive integer",
                ))?,
            None => DEFAULT_MAX_AGE_SECS,
        };

        let group_id = match non_empty("GITLAB_GROUP_ID") {
            Some(raw) => Some(
                raw.parse::<u64>().map_err(|_| {
                    ConfigError::Invalid("GITLAB_GROUP_ID", "must be a valid integer")
                })?,
            ),
            None => None,
        };

        let gitlab = GitlabSettings {
            url: non_empty("GITLAB_URL"),
            token: non_empty("GITLAB_TOKEN"),
            group_id,
            include_project: non_empty("GITLAB_INCLUDE_PROJECT"),
            include_file: non_empty("GITLAB_INCLUDE_FILE")
                .unwrap_or_else(|| DEFAULT_INCLUDE_FILE.to_string()),
            include_ref: non_empty("GITLAB_INCLUDE_REF")
                .unwrap_or_else(|| DEFAULT_INCLUDE_REF.to_string()),
        };

        let engine = EngineSettings {
            engine_repo: lookup("ENGINE_REPO").unwrap_or_default(),
            engine_temp_dir: lookup("ENGINE_TEMP_DIR").unwrap_or_default(),
            ci_job_token: lookup("CI_JOB_TOKEN").unwrap_or_default(),
        };

        Ok(Self {
            bot_token,
            auth_max_age_secs,
            gitlab,
            engine,
        })
    }

    /// Payload validator for the configured bot secret.
    pub fn validator(&self) -> Result<Validator, ConfigError> {
        let secret = self
            .bot_token
            .as_deref()
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        Ok(Validator::new(secret).with_max_age(self.auth_max_age_secs))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
