// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for the inventory listener.
//!
//! This crate holds the pure, synchronous part of the ingestion pipeline:
//!
//! - [`nevra`] - package filename codec
//! - [`report`] - inbound [`RawReport`] decoding
//! - [`request`] - canonical request building and checksums
//! - [`host`] - the [`StoredHost`] record handed to persistence
//!
//! # Example
//!
//! ```
//! use inventory_listener_core::{request, RawReport, StoredHost, ChecksumStatus};
//!
//! let report = RawReport::decode(
//!     br#"{"id": 1, "arch": "x86_64", "packages": ["foo-1.0-1.x86_64.rpm", "bar-1:9-123a.ia64.rpm"]}"#,
//! )?;
//! let built = request::build(&report)?;
//! assert_eq!(built.body, r#"{"package_list":["foo-1.0-1.x86_64"]}"#);
//!
//! let host = StoredHost::from_built(built);
//! assert_eq!(host.verify(), ChecksumStatus::Valid);
//! # Ok::<(), inventory_listener_core::CoreError>(())
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod host;
pub mod nevra;
pub mod report;
pub mod request;

pub use error::{CoreError, Result};
pub use host::{ChecksumStatus, StoredHost};
pub use nevra::Nevra;
pub use report::{HostId, RawReport};
pub use request::{BuiltRequest, CanonicalRequest};
