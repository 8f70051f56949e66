// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! In-memory object store for tests and local tooling.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{ObjectStore, PutResult, StorageError, StoredObject};

struct StoredEntry {
    body: Vec<u8>,
    content_type: String,
    #[allow(dead_code)]
    metadata: BTreeMap<String, String>,
}

/// HashMap-backed object store with S3-ish semantics (idempotent delete,
/// content-addressed etags).
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, StoredEntry>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PutResult, StorageError> {
        let etag = {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            format!("{:x}", hasher.finalize())
        };

        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Upstream("object store lock poisoned".to_string()))?;
        objects.insert(
            key.to_string(),
            StoredEntry {
                body: bytes,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );

        Ok(PutResult { etag })
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Upstream("object store lock poisoned".to_string()))?;
        let entry = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(StoredObject {
            body: entry.body.clone(),
            content_type: entry.content_type.clone(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Upstream("object store lock poisoned".to_string()))?;
        objects.remove(key);
        Ok(())
    }

    fn download_url(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}
