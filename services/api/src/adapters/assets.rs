//! services/api/src/adapters/assets.rs
//!
//! This module contains the adapter for the external asset host. It implements
//! the `AssetStore` port from the `core` crate, uploading encoded images over
//! HTTPS and deleting retired ones.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AssetHostConfig;
use storynest_core::media::EncodedImage;
use storynest_core::ports::{AssetStore, PortError, PortResult, PublishedAsset};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AssetStore` against the asset host's HTTP API.
#[derive(Clone)]
pub struct HttpAssetStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl HttpAssetStore {
    /// Creates a new `HttpAssetStore` from the asset-host configuration.
    pub fn new(config: &AssetHostConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct UploadRequest<'a> {
    /// The data URI produced by the ingest step.
    file: &'a str,
    folder: &'a str,
    /// Ask the host to pick format and quality automatically.
    transformation: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Serialize)]
struct DestroyRequest<'a> {
    public_id: &'a str,
}

//=========================================================================================
// `AssetStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn publish(&self, image: &EncodedImage, folder: &str) -> PortResult<PublishedAsset> {
        let url = format!("{}/image/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&UploadRequest {
                file: &image.data_uri,
                folder,
                transformation: "q_auto,f_auto",
            })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Asset host upload failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Asset host upload returned status {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Asset host upload response malformed: {e}")))?;

        Ok(PublishedAsset {
            url: body.secure_url,
            asset_id: body.public_id,
        })
    }

    async fn retire(&self, asset_id: &str) -> PortResult<()> {
        let url = format!("{}/image/destroy", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&DestroyRequest { public_id: asset_id })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Asset host delete failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Asset host delete returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// Local-Mode Store
//=========================================================================================

/// Legacy/local-mode `AssetStore` that writes uploads into the directory the
/// server also serves statically under `/uploads`. Used when no asset host is
/// configured.
#[derive(Clone)]
pub struct LocalAssetStore {
    upload_dir: std::path::PathBuf,
}

impl LocalAssetStore {
    pub fn new(upload_dir: std::path::PathBuf) -> Self {
        Self { upload_dir }
    }

    fn file_path(&self, name: &str) -> Option<std::path::PathBuf> {
        // Asset names are generated server-side; anything with a separator is
        // not ours.
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return None;
        }
        Some(self.upload_dir.join(name))
    }
}

const LOCAL_ASSET_PREFIX: &str = "local:";

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn publish(&self, image: &EncodedImage, folder: &str) -> PortResult<PublishedAsset> {
        let (mime_type, bytes) = image
            .decode()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let extension = match mime_type.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            _ => "jpg",
        };
        let name = format!("{}-{}.{}", folder, uuid::Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to create upload dir: {e}")))?;
        let path = self
            .file_path(&name)
            .ok_or_else(|| PortError::Unexpected("Generated an invalid asset name".to_string()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to store upload: {e}")))?;

        Ok(PublishedAsset {
            url: format!("/uploads/{name}"),
            asset_id: format!("{LOCAL_ASSET_PREFIX}{name}"),
        })
    }

    async fn retire(&self, asset_id: &str) -> PortResult<()> {
        let Some(name) = asset_id.strip_prefix(LOCAL_ASSET_PREFIX) else {
            return Err(PortError::Unexpected(format!(
                "Not a local asset: {asset_id}"
            )));
        };
        let Some(path) = self.file_path(name) else {
            return Err(PortError::Unexpected(format!(
                "Invalid local asset name: {name}"
            )));
        };
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to remove upload: {e}")))?;
        Ok(())
    }
}
