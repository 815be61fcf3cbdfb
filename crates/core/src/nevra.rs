// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! NEVRA codec.
//!
//! Splits an RPM filename into its Name-Epoch-Version-Release-Architecture
//! components and joins a set of components back into the canonical
//! filename form:
//!
//! ```text
//! foo-1.0-1.i386.rpm      -> foo, 0, 1.0, 1, i386
//! bar-1:9-123a.ia64.rpm   -> bar, 1, 9, 123a, ia64
//! ```
//!
//! Both directions are total: parsing an arbitrary string yields `None`
//! instead of an error, and joining yields `None` when any component is
//! missing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Archive suffix stripped before matching.
pub const RPM_SUFFIX: &str = ".rpm";

/// Epoch assumed when the filename carries none.
pub const DEFAULT_EPOCH: &str = "0";

static NEVRA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*)-(([0-9]+):)?([^-]+)-([^-]+)\.([a-z0-9_]+)$")
        .expect("NEVRA pattern is valid")
});

/// Components of a package filename.
///
/// `Nevra::default()` is the all-empty value; it never formats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nevra {
    /// Package name, may itself contain dashes.
    pub name: String,
    /// Epoch, `"0"` when the filename has none.
    pub epoch: String,
    /// Upstream version.
    pub version: String,
    /// Package release.
    pub release: String,
    /// Target architecture.
    pub arch: String,
}

impl Nevra {
    /// Parse a package filename, with or without the `.rpm` suffix.
    ///
    /// Returns `None` when the name does not look like
    /// `name-[epoch:]version-release.arch`.
    pub fn parse(filename: &str) -> Option<Self> {
        let stem = filename.strip_suffix(RPM_SUFFIX).unwrap_or(filename);
        let caps = NEVRA_RE.captures(stem)?;

        Some(Self {
            name: caps[1].to_string(),
            epoch: caps
                .get(3)
                .map_or_else(|| DEFAULT_EPOCH.to_string(), |m| m.as_str().to_string()),
            version: caps[4].to_string(),
            release: caps[5].to_string(),
            arch: caps[6].to_string(),
        })
    }

    /// Join the components into `name-[epoch:]version-release.arch`.
    ///
    /// Returns `None` unless every component is non-empty. The epoch is
    /// written only when it is a non-zero integer; anything that does not
    /// parse as an integer is dropped silently.
    pub fn to_filename(&self) -> Option<String> {
        if !self.is_complete() {
            return None;
        }

        let epoch = if is_nonzero_integer(&self.epoch) {
            format!("{}:", self.epoch)
        } else {
            String::new()
        };

        Some(format!(
            "{}-{}{}-{}.{}",
            self.name, epoch, self.version, self.release, self.arch
        ))
    }

    /// Whether every component is non-empty.
    pub fn is_complete(&self) -> bool {
        !(self.name.is_empty()
            || self.epoch.is_empty()
            || self.version.is_empty()
            || self.release.is_empty()
            || self.arch.is_empty())
    }
}

/// Whether `value` is a signed decimal integer other than zero, of any width.
fn is_nonzero_integer(value: &str) -> bool {
    let value = value.trim();
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && digits.bytes().any(|b| b != b'0')
}

/// Split `filename` into NEVRA components.
pub fn split_filename(filename: &str) -> Option<Nevra> {
    Nevra::parse(filename)
}

/// Build a canonical filename from separate components.
pub fn join_filename(
    name: &str,
    epoch: &str,
    version: &str,
    release: &str,
    arch: &str,
) -> Option<String> {
    Nevra {
        name: name.to_string(),
        epoch: epoch.to_string(),
        version: version.to_string(),
        release: release.to_string(),
        arch: arch.to_string(),
    }
    .to_filename()
}
