// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Corax Deploy - payload validation and cluster config derivation
//!
//! This crate holds the pieces of the PaaS Cloud manager that carry real
//! correctness properties:
//! - [`signature`]: verifies signed web-app payloads (HMAC-SHA256 over a sorted check-string)
//! - [`flavor`]: parses `"<cpu>/<ram> <overcommit>%"` flavor descriptors
//! - [`subnet`]: derives gateway, deploy node and Corax nodes from a CIDR
//! - [`plan`]: assembles the CI/CD variables and pipeline include file for a new project
//! - [`pipeline`]: maps GitLab pipeline statuses to progress
//! - [`config`]: settings loaded from the process environment
//!
//! OAuth flows, HTTP routing and GitLab API calls live in the surrounding
//! service and are not part of this crate.

pub mod config;
pub mod error;
pub mod flavor;
pub mod pipeline;
pub mod plan;
pub mod signature;
pub mod subnet;

pub use config::{ConfigError, GitlabSettings, Settings};
pub use error::{Error, Result};
pub use flavor::{FlavorSpec, parse_flavor};
pub use pipeline::{PipelineProgress, PipelineStatus, pipeline_url};
pub use plan::{
    CiVariable, DeploymentPlan, DeploymentRequest, EngineSettings, PlanError, pipeline_config,
    target_branch,
};
pub use signature::{DEFAULT_MAX_AGE_SECS, Validator, sign, signed_payload, validate};
pub use subnet::{NodeDescriptor, SubnetError, SubnetSpec, parse_subnet};
