// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for corax-deploy.
//!
//! Payload validation deliberately has no error type: every failure is a
//! plain `false`. The errors below cover configuration and deployment
//! planning, where callers need to tell failures apart.

use thiserror::Error;

use crate::config::ConfigError;
use crate::plan::PlanError;
use crate::subnet::SubnetError;

/// Result type using the crate-level Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by corax-deploy operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings are missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The cluster subnet could not be used.
    #[error(transparent)]
    Subnet(#[from] SubnetError),

    /// The deployment plan could not be assembled.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_error_is_transparent() {
        let err: Error = SubnetError::InsufficientAddresses {
            subnet: "10.0.0.0/30".to_string(),
            available: 4,
            required: 8,
        }
        .into();
        assert!(matches!(err, Error::Subnet(_)));
        assert!(err.to_string().contains("10.0.0.0/30"));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: Error = ConfigError::Missing("BOT_TOKEN").into();
        assert_eq!(
            err.to_string(),
            "missing required environment variable: BOT_TOKEN"
        );
    }
}
