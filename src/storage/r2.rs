// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! S3-compatible object store client.
//!
//! Talks to the storage endpoint over plain HTTP, authorizing each call
//! with a freshly presigned URL from the [`Presigner`]. No SDK, no
//! connection state beyond the reqwest client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, StatusCode};

use super::presign::{Presigner, DEFAULT_EXPIRES_SECS};
use super::{ObjectStore, PutResult, StorageError, StoredObject};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Object store backed by an R2-style S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct R2Client {
    presigner: Presigner,
    http: Client,
}

impl R2Client {
    pub fn new(presigner: Presigner) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| StorageError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { presigner, http })
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PutResult, StorageError> {
        let url = self
            .presigner
            .presign("PUT", key, DEFAULT_EXPIRES_SECS, Utc::now());

        let mut request = self
            .http
            .put(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        // Only `host` is in the signed header set, so these ride
        // unsigned; the bucket must accept unsigned metadata headers.
        for (name, value) in metadata {
            let header_name = format!("x-amz-meta-{name}");
            request = request.header(header_name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Upstream(format!("PUT {key} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upstream(format!(
                "PUT {key} returned {status}: {body}"
            )));
        }

        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .unwrap_or_default();

        Ok(PutResult { etag })
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let url = self
            .presigner
            .presign("GET", key, DEFAULT_EXPIRES_SECS, Utc::now());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::Upstream(format!("GET {key} failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upstream(format!(
                "GET {key} returned {status}: {body}"
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| StorageError::Upstream(format!("GET {key} body read failed: {e}")))?;

        Ok(StoredObject {
            body: body.to_vec(),
            content_type,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let url = self
            .presigner
            .presign("DELETE", key, DEFAULT_EXPIRES_SECS, Utc::now());

        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| StorageError::Upstream(format!("DELETE {key} failed: {e}")))?;

        // S3-style deletes are idempotent; 404 still counts as deleted.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upstream(format!(
                "DELETE {key} returned {status}: {body}"
            )));
        }

        Ok(())
    }

    fn download_url(&self, key: &str) -> String {
        self.presigner
            .presign("GET", key, DEFAULT_EXPIRES_SECS, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> R2Client {
        R2Client::new(Presigner::new("acct", "bucket", "ak", "sk")).unwrap()
    }

    #[test]
    fn download_url_is_presigned() {
        let url = client().download_url("assets/a.bin");
        assert!(url.starts_with("https://acct.r2.cloudflarestorage.com/bucket/assets/a.bin?"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
    }
}
