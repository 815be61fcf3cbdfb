// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request canonicalization.
//!
//! A [`RawReport`] is reduced to the packages matching the host
//! architecture, each rewritten into canonical NEVRA form, and serialized
//! into compact JSON. The SHA-256 of those exact bytes is the checksum
//! stored alongside the request, so identical reports must always yield
//! identical bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};
use crate::nevra::Nevra;
use crate::report::{HostId, RawReport};

/// Canonical request body derived from a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRequest {
    /// Canonical filenames of the packages matching the host architecture.
    pub package_list: Vec<String>,
}

impl CanonicalRequest {
    /// Serialize as compact JSON, e.g. `{"package_list":["foo-1.0-1.x86_64"]}`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(CoreError::Serialize)
    }
}

/// Serialized request ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    /// Host the request belongs to.
    pub id: HostId,
    /// Structured form of the request.
    pub request: CanonicalRequest,
    /// Compact JSON body.
    pub body: String,
    /// Lowercase hex SHA-256 of `body`.
    pub checksum: String,
}

/// Filter and canonicalize the packages of a report.
///
/// Keeps the input order. Packages that do not parse, or whose
/// architecture differs from the host's, are dropped.
pub fn canonicalize(report: &RawReport) -> CanonicalRequest {
    let package_list = report
        .packages
        .iter()
        .filter_map(|filename| Nevra::parse(filename))
        .filter(|nevra| nevra.arch == report.arch)
        .filter_map(|nevra| nevra.to_filename())
        .collect();

    CanonicalRequest { package_list }
}

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Build the stored request body and its checksum for a report.
pub fn build(report: &RawReport) -> Result<BuiltRequest> {
    let request = canonicalize(report);
    let body = request.to_json()?;
    let checksum = checksum(body.as_bytes());

    Ok(BuiltRequest {
        id: report.id,
        request,
        body,
        checksum,
    })
}
