// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! VM flavor descriptors such as `"2/4 30%"` (2 vCPU, 4 GiB RAM, 30% overcommit).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FLAVOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/(\d+)\s*(\d+)%?").expect("flavor pattern is valid"));

/// Overcommit percentage the platform expresses as a ratio.
const RATIO_OVERCOMMIT: &str = "30";
const RATIO_OVERCOMMIT_VALUE: &str = "1:3";

/// CPU, RAM and overcommit parsed from a flavor string.
///
/// Fields stay empty when the input does not look like a flavor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorSpec {
    /// Core count, verbatim digits.
    pub cpu: String,
    /// RAM in GiB, verbatim digits.
    pub ram: String,
    /// Overcommit percentage, or `"1:3"` for 30%.
    pub overcommit: String,
}

impl FlavorSpec {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty() && self.ram.is_empty() && self.overcommit.is_empty()
    }
}

/// Parse a flavor string. Malformed input yields an empty spec, never an error.
pub fn parse_flavor(flavor: &str) -> FlavorSpec {
    let Some(caps) = FLAVOR_PATTERN.captures(flavor) else {
        return FlavorSpec::default();
    };

    let overcommit = match &caps[3] {
        RATIO_OVERCOMMIT => RATIO_OVERCOMMIT_VALUE.to_string(),
        other => other.to_string(),
    };

    FlavorSpec {
        cpu: caps[1].to_string(),
        ram: caps[2].to_string(),
        overcommit,
    }
}
