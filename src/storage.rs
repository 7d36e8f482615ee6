//! Object storage for generated artifacts.
//!
//! [`ObjectStore`] receives a staged local file and an object key and returns
//! the URL the artifact can be downloaded from. [`HttpStore`] PUTs the file to
//! an S3/COS-style endpoint; [`LocalStore`] copies it into a directory.

use crate::config::StorageConfig;
use crate::error::Md2OfficeError;
use reqwest::Url;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Key prefix for `.docx` artifacts.
pub const DOCUMENT_PREFIX: &str = "documents";
/// Key prefix for `.xlsx` artifacts.
pub const SPREADSHEET_PREFIX: &str = "excel_documents";

/// Destination for finished artifacts.
pub trait ObjectStore: Sync {
    /// Store the file at `path` under `key`, returning its public URL.
    fn upload(
        &self,
        path: &Path,
        key: &str,
    ) -> impl Future<Output = Result<String, Md2OfficeError>> + Send;
}

/// `<base>/<key>` with each key segment percent-encoded.
pub fn object_url(base: &str, key: &str) -> Result<Url, Md2OfficeError> {
    let mut url = Url::parse(base)
        .map_err(|e| Md2OfficeError::InvalidConfig(format!("bad storage URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| Md2OfficeError::InvalidConfig(format!("storage URL '{base}' cannot be a base")))?
        .pop_if_empty()
        .extend(key.split('/'));
    Ok(url)
}

/// Uploads with an HTTP PUT of the whole file.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl HttpStore {
    pub fn new(config: StorageConfig) -> Result<Self, Md2OfficeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("md2office/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Md2OfficeError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

impl ObjectStore for HttpStore {
    async fn upload(&self, path: &Path, key: &str) -> Result<String, Md2OfficeError> {
        let failed = |reason: String| Md2OfficeError::UploadFailed {
            key: key.to_string(),
            reason,
        };

        let body = tokio::fs::read(path)
            .await
            .map_err(|e| failed(format!("reading {}: {e}", path.display())))?;
        let target = object_url(&self.config.upload_base(), key)?;
        info!("Uploading {} bytes to {}", body.len(), target);

        let mut request = self.client.put(target).body(body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status.as_u16())));
        }

        let url = object_url(&self.config.public_base(), key)?;
        debug!("Upload of {} complete", key);
        Ok(url.to_string())
    }
}

/// Copies artifacts into a local directory, mirroring the key layout.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for LocalStore {
    async fn upload(&self, path: &Path, key: &str) -> Result<String, Md2OfficeError> {
        let failed = |reason: String| Md2OfficeError::UploadFailed {
            key: key.to_string(),
            reason,
        };
        let dest = self.root.join(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(e.to_string()))?;
        }
        tokio::fs::copy(path, &dest)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let absolute = tokio::fs::canonicalize(&dest)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let url = Url::from_file_path(&absolute)
            .map_err(|_| failed(format!("{} is not a valid file URL", absolute.display())))?;
        info!("Stored {} at {}", key, absolute.display());
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_percent_encoded_per_segment() {
        let url = object_url(
            "https://bucket.cos.ap-guangzhou.myqcloud.com",
            "documents/月报_20240101.docx",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://bucket.cos.ap-guangzhou.myqcloud.com/documents/%E6%9C%88%E6%8A%A5_20240101.docx"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let url = object_url("http://127.0.0.1:9000/reports/", "excel_documents/a.xlsx").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/reports/excel_documents/a.xlsx");
    }

    #[test]
    fn unusable_base_is_a_config_error() {
        assert!(matches!(
            object_url("mailto:someone", "a"),
            Err(Md2OfficeError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn local_store_copies_under_key() {
        let src_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("temp_1.docx");
        std::fs::write(&src, b"payload").unwrap();
        let root = tempfile::tempdir().unwrap();

        let store = LocalStore::new(root.path());
        let url = store.upload(&src, "documents/report_20240101.docx").await.unwrap();

        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/documents/report_20240101.docx"));
        let stored = std::fs::read(root.path().join("documents/report_20240101.docx")).unwrap();
        assert_eq!(stored, b"payload");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_upload_failure() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.xlsx");
        std::fs::write(&src, b"x").unwrap();
        let store = HttpStore::new(StorageConfig {
            upload_url: Some("http://127.0.0.1:9".into()),
            ..StorageConfig::from_lookup(|_| None)
        })
        .unwrap();
        let err = store.upload(&src, "excel_documents/a.xlsx").await.unwrap_err();
        assert!(matches!(err, Md2OfficeError::UploadFailed { ref key, .. } if key == "excel_documents/a.xlsx"));
        assert!(!err.is_validation());
    }
}
