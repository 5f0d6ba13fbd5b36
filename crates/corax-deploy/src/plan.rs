// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment plan for a new Corax project.
//!
//! Everything the provisioning glue writes into GitLab is assembled here:
//! the CI/CD variables derived from the user's subnet and flavor, and the
//! pipeline file that pulls the shared jobs from the central project.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::Result;
use crate::flavor::{FlavorSpec, parse_flavor};
use crate::subnet::{SubnetSpec, parse_subnet};

/// Commit message for the generated pipeline file.
pub const PIPELINE_COMMIT_MESSAGE: &str = "Add .gitlab-ci.yml with include from central repository";

/// Branch used when the project reports no default branch.
pub const FALLBACK_BRANCH: &str = "main";

/// Job files pulled from the central pipeline project, in include order.
pub const PIPELINE_INCLUDES: [&str; 14] = [
    "ci/stages.yml",
    "ci/variables.yml",
    "ci/templates.yml",
    "ci/templates/ssh_functions.yml",
    "ci/jobs/config_generation.yml",
    "ci/jobs/api_magic_router.yml",
    "ci/jobs/connectivity.yml",
    "terraform-ci/jobs/terraform-sg.yml",
    "terraform-ci/jobs/terraform.yml",
    "ci/jobs/deploy_node_init.yml",
    "ci/jobs/archive_deployment.yml",
    "ci/jobs/cluster_setup.yml",
    "ci/jobs/corax_deployment.yml",
    "ci/jobs/jam.yml",
];

/// Engine directories copied into the job workspace before every job.
const ENGINE_DIRS: [&str; 4] = ["ci", "terraform-ci", "terraform", "terraform-sg"];

/// Pipeline sources allowed to start a run.
const PIPELINE_SOURCES: [&str; 3] = ["trigger", "web", "api"];

/// Errors assembling a deployment plan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// No central pipeline project to include from.
    #[error("GITLAB_INCLUDE_PROJECT not configured")]
    MissingIncludeProject,
}

/// Engine checkout settings shared by every project.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub engine_repo: String,
    pub engine_temp_dir: String,
    pub ci_job_token: String,
}

impl std::fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSettings")
            .field("engine_repo", &self.engine_repo)
            .field("engine_temp_dir", &self.engine_temp_dir)
            .field("ci_job_token", &"<redacted>")
            .finish()
    }
}

/// What the user asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Cloud project ID taken from the identity provider.
    pub cloud_project_id: String,
    pub project_name: String,
    /// Free-form description, stored as the cluster number.
    pub description: String,
    pub subnet: String,
    pub flavor: String,
}

/// One CI/CD variable on the new project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiVariable {
    pub key: String,
    pub value: String,
    pub protected: bool,
    pub masked: bool,
}

impl CiVariable {
    fn plain(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
            protected: false,
            masked: false,
        }
    }
}

/// Derived configuration and variables for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub subnet: SubnetSpec,
    pub flavor: FlavorSpec,
    pub variables: Vec<CiVariable>,
}

impl DeploymentPlan {
    /// Derive subnet and flavor config and lay out the project variables.
    ///
    /// Fails when the subnet is malformed or too small; a malformed flavor
    /// only leaves the broker sizing variables empty.
    pub fn build(request: &DeploymentRequest, engine: &EngineSettings) -> Result<Self> {
        let subnet = parse_subnet(&request.subnet)?;
        let flavor = parse_flavor(&request.flavor);
        let nodes = subnet.nodes_json()?;

        let variables = vec![
            CiVariable::plain("ENGINE_REPO", engine.engine_repo.as_str()),
            CiVariable::plain("ENGINE_TEMP_DIR", engine.engine_temp_dir.as_str()),
            CiVariable::plain("CI_JOB_TOKEN", engine.ci_job_token.as_str()),
            CiVariable::plain("CLOUDRU_PROJECT_ID", request.cloud_project_id.as_str()),
            CiVariable::plain("project_id", request.cloud_project_id.as_str()),
            CiVariable::plain("CLUSTER_SUBNET", request.subnet.as_str()),
            CiVariable::plain("CLUSTER_GATEWAY", subnet.gateway_value()),
            CiVariable::plain("DEPLOY_NODE_HOST", subnet.deploy_host_value()),
            CiVariable::plain("CORAX_NODES", nodes),
            CiVariable::plain("GIS_PROJECT_NAME", request.project_name.as_str()),
            CiVariable::plain("CLUSTER_NUMBER", request.description.as_str()),
            CiVariable::plain("KAFKA_BROKER_CPU", flavor.cpu.as_str()),
            CiVariable::plain("KAFKA_BROKER_RAM", flavor.ram.as_str()),
            CiVariable::plain("KAFKA_BROKER_OVERSUBSCRIPTION", flavor.overcommit.as_str()),
        ];

        info!(
            project = %request.project_name,
            gateway = %subnet.gateway_value(),
            deploy_host = %subnet.deploy_host_value(),
            cpu = %flavor.cpu,
            ram = %flavor.ram,
            overcommit = %flavor.overcommit,
            "Deployment plan built"
        );

        Ok(Self {
            subnet,
            flavor,
            variables,
        })
    }

    /// Look up a variable value by key.
    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|v| v.key == key)
            .map(|v| v.value.as_str())
    }
}

/// Branch the pipeline file is committed to and the pipeline runs on.
pub fn target_branch(default_branch: Option<&str>) -> &str {
    default_branch
        .filter(|branch| !branch.is_empty())
        .unwrap_or(FALLBACK_BRANCH)
}

/// Render the project's pipeline file including the shared jobs.
pub fn pipeline_config(include_project: &str, include_ref: &str) -> Result<String> {
    if include_project.is_empty() {
        return Err(PlanError::MissingIncludeProject.into());
    }

    let mut yaml = String::from(
        "# Auto-generated .gitlab-ci.yml\n\
         # Includes pipeline configuration from central repository\n\n\
         workflow:\n  rules:\n",
    );
    for source in PIPELINE_SOURCES {
        let _ = writeln!(
            yaml,
            "  - if: $CI_PIPELINE_SOURCE == \"{source}\"\n    when: always"
        );
    }
    yaml.push_str("  - when: never\n\n");

    yaml.push_str("default:\n  before_script:\n");
    yaml.push_str("    - echo \"[Engine] Fetching engine files from $ENGINE_REPO...\"\n");
    yaml.push_str("    - rm -rf $ENGINE_TEMP_DIR\n");
    yaml.push_str(
        "    - git clone https://gitlab-ci-token:${CI_JOB_TOKEN}@${ENGINE_REPO} $ENGINE_TEMP_DIR\n",
    );
    for dir in ENGINE_DIRS {
        let _ = writeln!(yaml, "    - cp -r $ENGINE_TEMP_DIR/{dir} .");
    }
    yaml.push_str("    - chmod +x ci/scripts/*.sh\n");
    yaml.push_str("    - echo \"[Engine] Environment ready.\"\n\n");

    yaml.push_str("include:\n");
    for file in PIPELINE_INCLUDES {
        let _ = writeln!(
            yaml,
            "  - project: {include_project}\n    ref: {include_ref}\n    file: {file}"
        );
    }

    Ok(yaml)
}
