//! S3-compatible project storage

use crate::{
    error::format_bytes,
    transport::{ApiSurface, Credential, Transport},
    types::{FileUploadResult, StorageFile, StorageQuota},
    ClientError, Result, StorageConfig,
};
use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Body, Method,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Options for [`StorageClient::upload`]
#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    /// Content type sent with the upload; guessed from the key when unset
    pub content_type: Option<String>,
    /// Override the client's `auto_check_quota` for this call
    pub check_quota: Option<bool>,
}

impl UploadOptions {
    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Force the quota check on or off
    pub fn with_check_quota(mut self, check: bool) -> Self {
        self.check_quota = Some(check);
        self
    }
}

/// Options for [`StorageClient::list_files`]
#[derive(Clone, Debug, Default)]
pub struct ListFilesOptions {
    /// Only keys starting with this prefix
    pub prefix: Option<String>,
    /// Maximum number of files
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
struct DownloadResponse {
    url: String,
}

#[derive(Deserialize)]
struct ListFilesResponse {
    #[serde(default, deserialize_with = "crate::types::null_as_default")]
    files: Vec<StorageFile>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct DeleteBatchRequest<'a> {
    keys: &'a [String],
}

/// Storage client
///
/// Uses its own connection pool and a longer default timeout than the
/// data client.
#[derive(Clone, Debug)]
pub struct StorageClient {
    config: StorageConfig,
    transport: Transport,
}

impl StorageClient {
    /// Create a new storage client
    pub fn new(config: StorageConfig) -> Result<Self> {
        let transport = Transport::new(
            &config.project_url,
            Credential::Bearer(&config.api_key),
            &config.user_agent,
            config.timeout,
            ApiSurface::Storage,
        )?;
        Ok(Self { config, transport })
    }

    /// Get the configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Current quota and usage
    #[instrument(skip(self))]
    pub async fn get_quota(&self) -> Result<StorageQuota> {
        self.transport.get_json("/api/v1/storage/quota", &[]).await
    }

    /// Upload `data` under `key`
    ///
    /// With the quota check enabled the quota is fetched first and the
    /// upload is refused locally when `data` does not fit. The check is
    /// best-effort: usage can change between the two requests.
    #[instrument(skip(self, data, options))]
    pub async fn upload(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        options: UploadOptions,
    ) -> Result<FileUploadResult> {
        let data = data.into();
        let required = data.len() as i64;

        if options.check_quota.unwrap_or(self.config.auto_check_quota) {
            let quota = self.get_quota().await?;
            if quota.storage_available_bytes < required {
                warn!(
                    required,
                    available = quota.storage_available_bytes,
                    "Upload rejected by quota check"
                );
                return Err(ClientError::StorageLimitExceeded {
                    message: format!(
                        "Need {}, but only {} available",
                        format_bytes(required),
                        format_bytes(quota.storage_available_bytes)
                    ),
                    required_bytes: required,
                    available_bytes: quota.storage_available_bytes,
                    status: None,
                    response: None,
                });
            }
        }

        let file_type = match &options.content_type {
            Some(ct) => ct.clone(),
            None => mime_guess::from_path(key)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        let part = Part::stream_with_length(Body::from(data), required as u64)
            .file_name(key.to_string())
            .mime_str(&file_type)
            .map_err(|e| ClientError::Config(format!("Invalid content type {:?}: {}", file_type, e)))?;

        let mut form = Form::new().text("key", key.to_string());
        if let Some(ct) = options.content_type {
            form = form.text("content_type", ct);
        }
        form = form.part("file", part);

        debug!(size = required, "Uploading file");
        self.transport
            .send_multipart("/api/v1/storage/upload", form)
            .await
            .map_err(|e| match e {
                ClientError::StorageLimitExceeded {
                    message,
                    available_bytes,
                    status,
                    response,
                    ..
                } => ClientError::StorageLimitExceeded {
                    message,
                    required_bytes: required,
                    available_bytes,
                    status,
                    response,
                },
                other => other,
            })
    }

    /// Presigned download URL valid for `expires_in` seconds
    #[instrument(skip(self))]
    pub async fn download(&self, key: &str, expires_in: u64) -> Result<String> {
        let query = [("key", key.to_string()), ("expires_in", expires_in.to_string())];
        let response: DownloadResponse = self
            .transport
            .get_json("/api/v1/storage/download", &query)
            .await?;
        Ok(response.url)
    }

    /// List stored files
    #[instrument(skip(self))]
    pub async fn list_files(&self, options: ListFilesOptions) -> Result<Vec<StorageFile>> {
        let mut query = Vec::new();
        if let Some(prefix) = options.prefix.filter(|p| !p.is_empty()) {
            query.push(("prefix", prefix));
        }
        if let Some(limit) = options.limit.filter(|l| *l > 0) {
            query.push(("limit", limit.to_string()));
        }

        let response: ListFilesResponse = self
            .transport
            .get_json("/api/v1/storage/list", &query)
            .await?;
        Ok(response.files)
    }

    /// Delete one file
    #[instrument(skip(self))]
    pub async fn delete_file(&self, key: &str) -> Result<()> {
        self.send_delete("/api/v1/storage/delete", &DeleteRequest { key })
            .await
    }

    /// Delete several files in one request
    #[instrument(skip(self), fields(count = keys.len()))]
    pub async fn delete_files(&self, keys: &[String]) -> Result<()> {
        self.send_delete("/api/v1/storage/delete-batch", &DeleteBatchRequest { keys })
            .await
    }

    /// Metadata of one file
    #[instrument(skip(self))]
    pub async fn get_file_info(&self, key: &str) -> Result<StorageFile> {
        self.transport
            .get_json("/api/v1/storage/info", &[("key", key.to_string())])
            .await
    }

    /// Check if a file exists
    #[instrument(skip(self))]
    pub async fn file_exists(&self, key: &str) -> Result<bool> {
        match self.get_file_info(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn send_delete<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let req = crate::transport::with_json(self.transport.request(Method::DELETE, path), body)?;
        self.transport.dispatch(req).await?;
        Ok(())
    }
}
