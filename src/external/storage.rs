use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

/// 上传的文件内容；filename 只用来推断扩展名
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub bytes: Vec<u8>,
    pub filename: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, file: &UploadFile, folder: &str) -> AppResult<StoredObject>;

    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// 本地磁盘存储
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        if key.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return Err(AppError::ValidationError(format!("invalid storage key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, file: &UploadFile, folder: &str) -> AppResult<StoredObject> {
        if file.bytes.is_empty() {
            return Err(AppError::ValidationError("file is empty".to_string()));
        }

        let name = match extension_of(&file.filename) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        let key = format!("{}/{name}", folder.trim_matches('/'));
        let path = self.path_for(&key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::UpstreamError(format!("storage mkdir failed: {e}")))?;
        }
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|e| AppError::UpstreamError(format!("storage write failed: {e}")))?;

        Ok(StoredObject {
            url: format!("{}/{key}", self.public_base_url),
            key,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::UpstreamError(format!("storage delete failed: {e}"))),
        }
    }
}
