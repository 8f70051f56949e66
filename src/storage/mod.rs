// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Object storage capability.
//!
//! The gateway treats the object store as a narrow `put/get/delete`-by-key
//! capability behind the [`ObjectStore`] trait. Production uses
//! [`R2Client`], which signs its own requests with the SigV4 presigner;
//! tests use [`InMemoryObjectStore`].

pub mod memory;
pub mod presign;
pub mod r2;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use memory::InMemoryObjectStore;
pub use presign::Presigner;
pub use r2::R2Client;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage request failed: {0}")]
    Upstream(String),
}

/// Result of storing an object.
#[derive(Debug, Clone)]
pub struct PutResult {
    /// Entity tag reported by the backend.
    pub etag: String,
}

/// An object read back from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Typed object-store capability.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object under `key`.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PutResult, StorageError>;

    /// Fetch the object stored under `key`.
    async fn get(&self, key: &str) -> Result<StoredObject, StorageError>;

    /// Delete the object stored under `key`. Deleting an absent key is
    /// not an error (upstream stores treat deletes as idempotent).
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// A URL a client can fetch the object from.
    fn download_url(&self, key: &str) -> String;
}
