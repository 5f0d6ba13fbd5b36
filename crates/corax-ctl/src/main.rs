// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Corax Control CLI
//!
//! Operator tool for checking signed web-app payloads and previewing what a
//! Corax deployment writes into GitLab, without touching GitLab itself.
//!
//! Usage:
//!   corax-ctl <command> [options]
//!
//! Commands:
//!   validate --payload <query>          Verify a signed payload
//!   sign --field <key=value>...         Mint a signed payload
//!   flavor <flavor>                     Parse a flavor descriptor
//!   subnet <cidr>                       Derive cluster addressing
//!   plan --project-name <name> ...      Print CI/CD variables for a deployment
//!   pipeline-file                       Print the generated .gitlab-ci.yml
//!   pipeline-status <status>            Map a pipeline status to progress
//!   config                              Show loaded settings (secrets redacted)

use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use corax_deploy::{
    DeploymentPlan, DeploymentRequest, PipelineProgress, PipelineStatus, Settings, parse_flavor,
    parse_subnet, pipeline_config, pipeline_url, signed_payload, target_branch,
};
use corax_deploy::plan::PIPELINE_COMMIT_MESSAGE;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "corax-ctl", version, about = "Corax deployment operator tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify a signed web-app payload
    Validate {
        /// URL-encoded payload including `hash` and `auth_date`
        #[arg(long)]
        payload: String,
        /// Bot secret (defaults to BOT_TOKEN)
        #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
        secret: Option<String>,
    },
    /// Mint a signed payload from key=value fields
    Sign {
        /// Field to include, repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Add `auth_date` set to the current time
        #[arg(long)]
        now: bool,
        /// Bot secret (defaults to BOT_TOKEN)
        #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
        secret: Option<String>,
    },
    /// Parse a flavor descriptor such as "2/4 30%"
    Flavor { flavor: String },
    /// Derive gateway, deploy node and Corax nodes from a CIDR
    Subnet { cidr: String },
    /// Print the CI/CD variables a deployment would set
    Plan {
        #[arg(long)]
        project_name: String,
        #[arg(long)]
        cloud_project_id: String,
        #[arg(long, default_value = "")]
        subnet: String,
        #[arg(long, default_value = "")]
        flavor: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Print the generated pipeline file
    PipelineFile {
        /// Central pipeline project (defaults to GITLAB_INCLUDE_PROJECT)
        #[arg(long)]
        include_project: Option<String>,
        /// Central project ref (defaults to GITLAB_INCLUDE_REF)
        #[arg(long)]
        include_ref: Option<String>,
        /// Default branch of the target project
        #[arg(long)]
        default_branch: Option<String>,
    },
    /// Map a GitLab pipeline status to progress
    PipelineStatus {
        status: String,
        /// Project web URL used to build the pipeline link
        #[arg(long, requires = "pipeline_id")]
        project_url: Option<String>,
        #[arg(long)]
        pipeline_id: Option<u64>,
    },
    /// Show loaded settings with secrets redacted
    Config,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli, settings: &Settings) -> Result<ExitCode> {
    match cli.command {
        Command::Validate { payload, secret } => {
            let validator = match secret {
                Some(secret) => corax_deploy::Validator::new(secret)
                    .with_max_age(settings.auth_max_age_secs),
                None => settings.validator()?,
            };
            if validator.validate(&payload) {
                info!("Payload is valid");
                println!("valid");
                Ok(ExitCode::SUCCESS)
            } else {
                warn!("Payload rejected");
                println!("invalid");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Sign {
            fields,
            now,
            secret,
        } => {
            let secret = secret
                .or_else(|| settings.bot_token.clone())
                .context("a secret is required (--secret or BOT_TOKEN)")?;
            let mut fields: BTreeMap<String, String> = fields.into_iter().collect();
            if fields.contains_key("hash") {
                bail!("the hash field is computed, do not pass it");
            }
            if now {
                fields.insert(
                    "auth_date".to_string(),
                    chrono::Utc::now().timestamp().to_string(),
                );
            }
            let payload = signed_payload(&fields, &secret)
                .map_err(|e| anyhow::anyhow!("signing failed: {e}"))?;
            println!("{payload}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Flavor { flavor } => {
            print_json(&parse_flavor(&flavor))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Subnet { cidr } => {
            let spec = parse_subnet(&cidr)?;
            print_json(&serde_json::json!({
                "CLUSTER_GATEWAY": spec.gateway_value(),
                "DEPLOY_NODE_HOST": spec.deploy_host_value(),
                "CORAX_NODES": spec.nodes_json()?,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan {
            project_name,
            cloud_project_id,
            subnet,
            flavor,
            description,
        } => {
            let request = DeploymentRequest {
                cloud_project_id,
                project_name,
                description,
                subnet,
                flavor,
            };
            let plan = DeploymentPlan::build(&request, &settings.engine)?;
            print_json(&plan.variables)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::PipelineFile {
            include_project,
            include_ref,
            default_branch,
        } => {
            let include_project = include_project
                .or_else(|| settings.gitlab.include_project.clone())
                .unwrap_or_default();
            let include_ref = include_ref.unwrap_or_else(|| settings.gitlab.include_ref.clone());
            let yaml = pipeline_config(&include_project, &include_ref)?;
            info!(
                file = %settings.gitlab.include_file,
                branch = target_branch(default_branch.as_deref()),
                commit_message = PIPELINE_COMMIT_MESSAGE,
                "Rendered pipeline file"
            );
            print!("{yaml}");
            Ok(ExitCode::SUCCESS)
        }
        Command::PipelineStatus {
            status,
            project_url,
            pipeline_id,
        } => {
            let status = PipelineStatus::from(status.as_str());
            let web_url = match (project_url, pipeline_id) {
                (Some(project_url), Some(id)) => pipeline_url(&project_url, id),
                _ => String::new(),
            };
            print_json(&PipelineProgress::new(&status, web_url))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            println!("{settings:#?}");
            match settings
                .gitlab
                .credentials()
                .and_then(|_| settings.gitlab.require_group_id())
            {
                Ok(group_id) => info!(group_id, "GitLab provisioning is configured"),
                Err(e) => warn!("GitLab provisioning unavailable: {}", e),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corax_ctl=info,corax_deploy=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &settings) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("query_id=AAH=1").unwrap(),
            ("query_id".to_string(), "AAH=1".to_string())
        );
        assert_eq!(
            parse_field("start_param=").unwrap(),
            ("start_param".to_string(), String::new())
        );
        assert!(parse_field("no-separator").is_err());
    }

    #[test]
    fn test_parse_plan_args() {
        let cli = Cli::try_parse_from([
            "corax-ctl",
            "plan",
            "--project-name",
            "corax-demo",
            "--cloud-project-id",
            "cloud-1",
            "--subnet",
            "10.10.10.0/24",
        ])
        .unwrap();
        match cli.command {
            Command::Plan {
                project_name,
                subnet,
                flavor,
                ..
            } => {
                assert_eq!(project_name, "corax-demo");
                assert_eq!(subnet, "10.10.10.0/24");
                assert_eq!(flavor, "");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_pipeline_status_requires_id_with_url() {
        let result = Cli::try_parse_from([
            "corax-ctl",
            "pipeline-status",
            "running",
            "--project-url",
            "https://gitlab.example.com/corax/demo",
        ]);
        assert!(result.is_err());
    }
}
