//! 把服务端返回的 base64 文件内容落地成可以保存的文件

pub mod artifact;
pub mod error;
pub mod saver;

use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tracing::{error, info};

use crate::auth::session::Session;
use crate::common::api::models::task::{DownloadStatus, DownloadTask};
use crate::common::api::operations::IdmApi;
use artifact::{Blob, ObjectUrlRegistry};
use error::MaterializeError;
use saver::SaveTarget;

/// 服务端不提供文件名，保存时统一使用这个名字
pub const DEFAULT_FILE_NAME: &str = "download";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct FileMaterializer {
    api: IdmApi,
    registry: ObjectUrlRegistry,
}

impl FileMaterializer {
    pub fn new(api: IdmApi) -> Self {
        Self::with_registry(api, ObjectUrlRegistry::new())
    }

    pub fn with_registry(api: IdmApi, registry: ObjectUrlRegistry) -> Self {
        Self { api, registry }
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    /// 只有下载成功的任务才能取文件，其他状态直接拒绝，不发请求
    pub fn ensure_downloadable(task: &DownloadTask) -> Result<(), MaterializeError> {
        match task.status() {
            DownloadStatus::Success => Ok(()),
            status @ (DownloadStatus::UndefinedStatus
            | DownloadStatus::Pending
            | DownloadStatus::Downloading
            | DownloadStatus::Failed) => Err(MaterializeError::NotDownloadable(status)),
        }
    }

    /// 取回文件内容并解码，不注册也不保存
    pub async fn fetch_blob(
        &self,
        session: &Session,
        download_task_id: Option<&str>,
    ) -> Result<Blob, MaterializeError> {
        let resp = self
            .api
            .get_download_task_file(session, download_task_id)?
            .await?;
        let bytes = decode_file_data(&resp.data.result.data)?;
        Ok(Blob::new(bytes))
    }

    /// 取回任务文件并通过对象 URL 触发保存，保存完立即释放 URL
    pub async fn download(
        &self,
        session: &Session,
        task: &DownloadTask,
        target: &dyn SaveTarget,
    ) -> Result<SavedArtifact, MaterializeError> {
        Self::ensure_downloadable(task)?;

        let blob = self
            .fetch_blob(session, task.id.as_deref())
            .await
            .map_err(|e| {
                error!("获取任务 {:?} 的文件失败: {}", task.id, e);
                e
            })?;

        let url = self.registry.create_object_url(blob);
        let result = self.save_object_url(&url, target).await;
        self.registry.revoke(&url);

        let saved = result?;
        info!(
            "任务 {} 的文件已保存到 {}",
            task.id.as_deref().unwrap_or("<unknown>"),
            saved.path.display()
        );
        Ok(saved)
    }

    async fn save_object_url(
        &self,
        url: &artifact::ObjectUrl,
        target: &dyn SaveTarget,
    ) -> Result<SavedArtifact, MaterializeError> {
        let blob = self
            .registry
            .resolve(url)
            .ok_or_else(|| MaterializeError::UrlRevoked(url.to_string()))?;
        let path = target.save(DEFAULT_FILE_NAME, &blob).await?;
        Ok(SavedArtifact {
            path,
            size: blob.len(),
        })
    }
}

/// 标准 base64（带填充）解码
pub fn decode_file_data(data: &str) -> Result<Vec<u8>, MaterializeError> {
    Ok(BASE64.decode(data.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hello() {
        assert_eq!(decode_file_data("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_file_data("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_file_data("not-base64!!").unwrap_err();
        assert!(matches!(err, MaterializeError::Base64(_)));
        assert_eq!(err.kind(), Some(crate::ErrorKind::Decode));
    }

    #[test]
    fn only_successful_tasks_are_downloadable() {
        for status in [
            DownloadStatus::UndefinedStatus,
            DownloadStatus::Pending,
            DownloadStatus::Downloading,
            DownloadStatus::Failed,
        ] {
            let task = DownloadTask {
                id: Some("1".into()),
                download_status: Some(status),
                ..Default::default()
            };
            assert!(matches!(
                FileMaterializer::ensure_downloadable(&task),
                Err(MaterializeError::NotDownloadable(s)) if s == status
            ));
        }

        let task = DownloadTask {
            download_status: Some(DownloadStatus::Success),
            ..Default::default()
        };
        assert!(FileMaterializer::ensure_downloadable(&task).is_ok());
    }
}
