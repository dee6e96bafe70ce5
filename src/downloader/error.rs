use thiserror::Error;

use crate::common::api::error::{ApiError, ErrorKind};
use crate::common::api::models::task::DownloadStatus;

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("文件内容不是有效的 base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("任务尚未下载完成，当前状态: {0}")]
    NotDownloadable(DownloadStatus),

    #[error("对象 URL 已失效: {0}")]
    UrlRevoked(String),

    #[error("保存文件失败: {0}")]
    Io(#[from] std::io::Error),
}

impl MaterializeError {
    /// 保存失败不属于三类接口错误，返回 None
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            MaterializeError::Api(e) => Some(e.kind()),
            MaterializeError::Base64(_) => Some(ErrorKind::Decode),
            MaterializeError::NotDownloadable(_) => Some(ErrorKind::Validation),
            MaterializeError::UrlRevoked(_) | MaterializeError::Io(_) => None,
        }
    }
}
