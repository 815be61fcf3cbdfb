// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Inbound package-inventory report.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Host identifier carried by a report and used as the storage key.
pub type HostId = i64;

/// A package inventory as published by a host.
///
/// Decoded from a JSON payload of the form
/// `{"id": 42, "arch": "x86_64", "packages": ["foo-1.0-1.x86_64.rpm"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReport {
    /// Host identifier.
    pub id: HostId,
    /// Architecture of the reporting host.
    pub arch: String,
    /// Installed package filenames in reported order.
    pub packages: Vec<String>,
}

impl RawReport {
    /// Decode a raw message payload.
    ///
    /// Any JSON error, including a missing or mistyped field, becomes
    /// [`CoreError::MalformedMessage`].
    pub fn decode(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| CoreError::MalformedMessage(e.to_string()))
    }
}
