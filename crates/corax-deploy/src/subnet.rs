// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cluster addressing derived from the subnet CIDR.
//!
//! Address layout inside the network (0-based offsets from the network address):
//!
//! | Offset | Use                  |
//! |--------|----------------------|
//! | 0      | network              |
//! | 1      | cluster gateway      |
//! | 2-3    | reserved             |
//! | 4      | deploy node          |
//! | 5-7    | Corax (Kafka) nodes  |

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Hostnames of the three Corax nodes, in address order.
pub const NODE_NAMES: [&str; 3] = [
    "kafka-bpmx-01.testgis-platform.tech.pd33.testowner.gtn",
    "kafka-bpmx-02.testgis-platform.tech.pd33.testowner.gtn",
    "kafka-bpmx-03.testgis-platform.tech.pd33.testowner.gtn",
];

/// Login user on every node.
pub const NODE_USER: &str = "root";

/// Roles assigned to every node.
pub const NODE_ROLES: [&str; 4] = ["kafka", "zookeeper", "crxsr", "crxui"];

const GATEWAY_OFFSET: u32 = 1;
const DEPLOY_HOST_OFFSET: u32 = 4;
const FIRST_NODE_OFFSET: u32 = 5;

/// Addresses a network must hold to place the gateway, deploy node and all nodes.
pub const REQUIRED_ADDRESSES: u64 = FIRST_NODE_OFFSET as u64 + NODE_NAMES.len() as u64;

/// Errors that can occur while deriving cluster addressing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubnetError {
    /// The input is not an IPv4 network.
    #[error("invalid subnet {subnet:?}: {reason}")]
    InvalidCidr { subnet: String, reason: String },

    /// The network is too small for the cluster layout.
    #[error(
        "not enough IP addresses in subnet {subnet}: {available} available, {required} required"
    )]
    InsufficientAddresses {
        subnet: String,
        available: u64,
        required: u64,
    },
}

/// A deployment target host and its roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    pub host: Ipv4Addr,
    pub user: String,
    pub roles: Vec<String>,
}

impl NodeDescriptor {
    fn corax(name: &str, host: Ipv4Addr) -> Self {
        Self {
            name: name.to_string(),
            host,
            user: NODE_USER.to_string(),
            roles: NODE_ROLES.iter().map(|role| role.to_string()).collect(),
        }
    }
}

/// Addressing for one cluster. Empty when no subnet was supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub gateway: Option<Ipv4Addr>,
    pub deploy_host: Option<Ipv4Addr>,
    pub nodes: Vec<NodeDescriptor>,
}

impl SubnetSpec {
    pub fn is_empty(&self) -> bool {
        self.gateway.is_none() && self.deploy_host.is_none() && self.nodes.is_empty()
    }

    /// Gateway address as stored in CI/CD variables (`""` when unset).
    pub fn gateway_value(&self) -> String {
        self.gateway.map(|ip| ip.to_string()).unwrap_or_default()
    }

    /// Deploy node address as stored in CI/CD variables (`""` when unset).
    pub fn deploy_host_value(&self) -> String {
        self.deploy_host.map(|ip| ip.to_string()).unwrap_or_default()
    }

    /// JSON array of `{name, host, user, roles}` records (`""` when there are no nodes).
    pub fn nodes_json(&self) -> Result<String, serde_json::Error> {
        if self.nodes.is_empty() {
            return Ok(String::new());
        }
        serde_json::to_string(&self.nodes)
    }
}

/// Derive cluster addressing from `subnet`.
///
/// Host bits may be set (`10.10.10.7/24` is the same network as `10.10.10.0/24`)
/// and a bare address is read as a /32. An empty string yields an empty spec.
pub fn parse_subnet(subnet: &str) -> Result<SubnetSpec, SubnetError> {
    if subnet.is_empty() {
        return Ok(SubnetSpec::default());
    }

    let network = parse_network(subnet)?;
    let available = 1u64 << (32 - u32::from(network.prefix_len()));
    if available < REQUIRED_ADDRESSES {
        return Err(SubnetError::InsufficientAddresses {
            subnet: subnet.to_string(),
            available,
            required: REQUIRED_ADDRESSES,
        });
    }

    let base = u32::from(network.network());
    let at = |offset: u32| Ipv4Addr::from(base + offset);

    let nodes = NODE_NAMES
        .iter()
        .zip(FIRST_NODE_OFFSET..)
        .map(|(name, offset)| NodeDescriptor::corax(name, at(offset)))
        .collect();

    let spec = SubnetSpec {
        gateway: Some(at(GATEWAY_OFFSET)),
        deploy_host: Some(at(DEPLOY_HOST_OFFSET)),
        nodes,
    };

    info!(
        subnet,
        gateway = %spec.gateway_value(),
        deploy_host = %spec.deploy_host_value(),
        nodes = spec.nodes.len(),
        "Derived cluster addressing"
    );

    Ok(spec)
}

fn parse_network(subnet: &str) -> Result<Ipv4Net, SubnetError> {
    let invalid = |reason: String| SubnetError::InvalidCidr {
        subnet: subnet.to_string(),
        reason,
    };

    if subnet.contains('/') {
        subnet
            .parse::<Ipv4Net>()
            .map_err(|e| invalid(e.to_string()))
    } else {
        let addr = subnet
            .parse::<Ipv4Addr>()
            .map_err(|e| invalid(e.to_string()))?;
        Ipv4Net::new(addr, 32).map_err(|e| invalid(e.to_string()))
    }
}
