// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pipeline progress reported by the polling endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// GitLab pipeline status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
    /// Any status this crate does not know about, kept verbatim.
    Unknown(String),
}

impl PipelineStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Running => "running",
            PipelineStatus::Success => "success",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Canceled => "canceled",
            PipelineStatus::Skipped => "skipped",
            PipelineStatus::Manual => "manual",
            PipelineStatus::Scheduled => "scheduled",
            PipelineStatus::Unknown(status) => status.as_str(),
        }
    }

    /// Approximate completion percentage shown to the user.
    pub fn percent(&self) -> u8 {
        match self {
            PipelineStatus::Running => 50,
            PipelineStatus::Success
            | PipelineStatus::Failed
            | PipelineStatus::Canceled
            | PipelineStatus::Skipped => 100,
            PipelineStatus::Pending
            | PipelineStatus::Manual
            | PipelineStatus::Scheduled
            | PipelineStatus::Unknown(_) => 0,
        }
    }

    /// Check if the pipeline will not make further progress on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStatus::Success
                | PipelineStatus::Failed
                | PipelineStatus::Canceled
                | PipelineStatus::Skipped
        )
    }
}

impl From<&str> for PipelineStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => PipelineStatus::Pending,
            "running" => PipelineStatus::Running,
            "success" => PipelineStatus::Success,
            "failed" => PipelineStatus::Failed,
            "canceled" => PipelineStatus::Canceled,
            "skipped" => PipelineStatus::Skipped,
            "manual" => PipelineStatus::Manual,
            "scheduled" => PipelineStatus::Scheduled,
            other => PipelineStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body returned by the pipeline status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    pub status: String,
    pub percent: u8,
    pub web_url: String,
}

impl PipelineProgress {
    pub fn new(status: &PipelineStatus, web_url: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            percent: status.percent(),
            web_url: web_url.into(),
        }
    }
}

/// Web URL of a pipeline inside a project.
pub fn pipeline_url(project_web_url: &str, pipeline_id: u64) -> String {
    format!(
        "{}/-/pipelines/{}",
        project_web_url.trim_end_matches('/'),
        pipeline_id
    )
}
