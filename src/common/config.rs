use std::time::Duration;

use url::Url;

use crate::common::api::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("idm-client/", env!("CARGO_PKG_VERSION"));

/// 是否在请求中携带会话 Cookie
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialsPolicy {
    #[default]
    Include,
    Omit,
}

/// 连接配置，由外层应用在启动时提供
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub credentials: CredentialsPolicy,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // 常量地址，解析不会失败
            base_url: Url::parse(DEFAULT_BASE_URL).expect("默认地址无效"),
            credentials: CredentialsPolicy::Include,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidParameter(format!("无效的服务地址 {}: {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidParameter(format!(
                "服务地址必须是 http 或 https: {}",
                base_url
            )));
        }
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    pub fn with_credentials(mut self, credentials: CredentialsPolicy) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_service() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url.as_str(), "http://localhost:8081/");
        assert_eq!(config.credentials, CredentialsPolicy::Include);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn rejects_non_http_endpoints() {
        assert!(ClientConfig::new("ftp://example.com").is_err());
        assert!(ClientConfig::new("not a url").is_err());
        assert!(ClientConfig::new("https://idm.example.com/base/").is_ok());
    }
}
