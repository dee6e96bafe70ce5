pub mod session;

use tracing::{info, warn};

use crate::common::api::error::ApiError;
use crate::common::api::models::account::{
    ACCOUNT_NAME_MAX_LEN, ACCOUNT_NAME_MIN_LEN, Account, Credentials,
};
use crate::common::api::operations::IdmApi;
use session::Session;

// 注册、登录、退出的流程
#[derive(Debug, Clone)]
pub struct AuthManager {
    api: IdmApi,
    session: Session,
}

impl AuthManager {
    pub fn new(api: IdmApi, session: Session) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn api(&self) -> &IdmApi {
        &self.api
    }

    /// 注册账户，返回服务端分配的账户 ID
    pub async fn register(&self, account_name: &str, password: &str) -> Result<String, ApiError> {
        let request = credentials(account_name, password)?;
        let resp = self.api.create_account(&self.session, &request)?.await?;

        let account_id = resp.data.account_id.ok_or_else(|| {
            ApiError::InvalidResponse(format!("注册响应缺少 accountId: {}", resp.raw.body))
        })?;
        info!("账户已注册: {} ({})", account_name, account_id);
        Ok(account_id)
    }

    /// 登录
    ///
    /// 失败时会话保持原样；成功时账户快照被替换，Cookie 由传输层按 Set-Cookie 更新。
    pub async fn login(&self, account_name: &str, password: &str) -> Result<Account, ApiError> {
        let request = credentials(account_name, password)?;
        let resp = self.api.create_session(&self.session, &request)?.await?;

        // 没有账户信息的响应不能当作登录成功
        let account = resp.data.account.ok_or_else(|| {
            ApiError::InvalidResponse(format!("登录响应缺少 account: {}", resp.raw.body))
        })?;

        let base_url = &self.api.client().config().base_url;
        if !self.session.has_credential(base_url) {
            warn!("登录成功但没有收到认证 Cookie，后续请求可能被拒绝");
        }
        self.session.establish(account.clone());
        Ok(account)
    }

    /// 退出登录，服务端确认之后才清空本地会话
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.api.delete_session(&self.session)?.await?;
        self.session.clear();
        Ok(())
    }
}

fn credentials(account_name: &str, password: &str) -> Result<Credentials, ApiError> {
    let len = account_name.chars().count();
    if len == 0 {
        return Ok(Credentials {
            account_name: None,
            password: non_empty(password),
        });
    }
    if !(ACCOUNT_NAME_MIN_LEN..=ACCOUNT_NAME_MAX_LEN).contains(&len) {
        return Err(ApiError::InvalidParameter(format!(
            "账户名长度必须在 {} 到 {} 个字符之间",
            ACCOUNT_NAME_MIN_LEN, ACCOUNT_NAME_MAX_LEN
        )));
    }
    Ok(Credentials {
        account_name: Some(account_name.to_string()),
        password: non_empty(password),
    })
}

// 空串按缺失处理，交给接口表报 MissingParameter
fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_name_length_is_checked() {
        assert!(matches!(
            credentials("al", "pw"),
            Err(ApiError::InvalidParameter(_))
        ));
        assert!(matches!(
            credentials(&"a".repeat(21), "pw"),
            Err(ApiError::InvalidParameter(_))
        ));
        assert!(credentials("alice", "pw").is_ok());
        assert!(credentials(&"名".repeat(20), "pw").is_ok());
    }

    #[test]
    fn empty_fields_become_absent() {
        let creds = credentials("", "").unwrap();
        assert!(creds.account_name.is_none());
        assert!(creds.password.is_none());
    }
}
