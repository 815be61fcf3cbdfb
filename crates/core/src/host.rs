// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Stored host record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::HostId;
use crate::request::{checksum, BuiltRequest};

/// A host record as handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHost {
    /// Primary key, taken from the report.
    pub id: HostId,
    /// Serialized canonical request.
    pub request: String,
    /// Hex SHA-256 of `request`.
    pub checksum: String,
    /// Time the record was produced.
    pub updated: DateTime<Utc>,
}

/// Outcome of recomputing the checksum of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumStatus {
    /// The stored checksum matches the request bytes.
    Valid,
    /// The request or checksum was altered after it was written.
    Mismatch,
}

impl StoredHost {
    /// Create a record from a built request, stamped with the current time.
    pub fn from_built(built: BuiltRequest) -> Self {
        Self {
            id: built.id,
            request: built.body,
            checksum: built.checksum,
            updated: Utc::now(),
        }
    }

    /// Recompute the checksum over `request` and compare.
    pub fn verify(&self) -> ChecksumStatus {
        if checksum(self.request.as_bytes()) == self.checksum {
            ChecksumStatus::Valid
        } else {
            ChecksumStatus::Mismatch
        }
    }
}
