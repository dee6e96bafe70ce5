use reqwest::StatusCode;
use thiserror::Error;

use super::models::common::RpcStatus;

/// 错误的大类，UI 层据此决定如何提示用户
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 参数缺失或不合法，请求没有发出
    Validation,
    /// 没有收到响应，或者收到了非 2xx 响应
    Transport,
    /// 响应体与声明的类型不符
    Decode,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("缺少必需参数 '{param}'，调用 {operation} 时")]
    MissingParameter { param: String, operation: String },

    #[error("参数无效: {0}")]
    InvalidParameter(String),

    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("服务返回错误状态 {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("响应解析失败: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn missing(param: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::MissingParameter {
            param: param.into(),
            operation: operation.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingParameter { .. } | ApiError::InvalidParameter(_) => {
                ErrorKind::Validation
            }
            ApiError::Reqwest(_) | ApiError::Status { .. } => ErrorKind::Transport,
            ApiError::InvalidResponse(_) => ErrorKind::Decode,
        }
    }

    /// 非 2xx 响应的状态码
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Reqwest(e) => e.status(),
            _ => None,
        }
    }

    /// 尝试从错误响应体中取出服务端的 RpcStatus，取不到就返回 None
    pub fn rpc_status(&self) -> Option<RpcStatus> {
        match self {
            ApiError::Status { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    /// 给用户看的错误信息，优先使用服务端返回的 message
    pub fn user_message(&self) -> String {
        match self.rpc_status().and_then(|s| s.message) {
            Some(message) if !message.is_empty() => message,
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(
            ApiError::missing("downloadTaskId", "deleteDownloadTask").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ApiError::Status {
                status: StatusCode::UNAUTHORIZED,
                body: String::new()
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ApiError::InvalidResponse("x".into()).kind(),
            ErrorKind::Decode
        );
    }

    #[test]
    fn user_message_prefers_rpc_status() {
        let err = ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: r#"{"code":16,"message":"incorrect password","details":[]}"#.to_string(),
        };
        assert_eq!(err.user_message(), "incorrect password");
        assert_eq!(err.rpc_status().and_then(|s| s.code), Some(16));

        let err = ApiError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>bad gateway</html>".to_string(),
        };
        assert!(err.rpc_status().is_none());
        assert!(err.user_message().contains("502"));
    }
}
