// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types shared by the listener crates.

use thiserror::Error;

/// Errors raised while turning an inbound payload into a stored request.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Payload is not valid JSON or lacks one of `id`, `arch`, `packages`.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The canonical request could not be serialized.
    #[error("Failed to serialize canonical request: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
