use std::sync::{Arc, Mutex};

use cookie::Cookie;
use cookie_store::CookieStore;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest_cookie_store::CookieStoreMutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::common::api::models::account::Account;

/// 服务端下发的认证 Cookie 名
pub const AUTH_COOKIE_NAME: &str = "IDM_AUTH";

/// 显式传递的会话句柄
///
/// Cookie 和当前账户快照都放在这里，每个接口调用都会读取它。
/// clone 出来的句柄共享同一份状态，同一时刻只有一个有效的凭证。
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    cookie_store: CookieStoreMutex,
    account: Mutex<Option<Account>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前登录的账户，未登录时为 None
    pub fn account(&self) -> Option<Account> {
        self.account_guard().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.account_guard().is_some()
    }

    /// 登录成功之后记录账户快照，替换掉之前的
    pub fn establish(&self, account: Account) {
        info!(
            "会话已建立: {}",
            account.account_name.as_deref().unwrap_or("<unknown>")
        );
        *self.account_guard() = Some(account);
    }

    /// 退出登录，同时清空 Cookie 和账户快照
    pub fn clear(&self) {
        self.store().clear();
        *self.account_guard() = None;
        info!("会话已清除");
    }

    /// 请求某个地址时应该携带的 Cookie 请求头
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let store = self.store();
        let cookie_str = store
            .get_request_values(url)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<String>>()
            .join("; ");
        if cookie_str.is_empty() {
            None
        } else {
            Some(cookie_str)
        }
    }

    /// 保存响应中的 Set-Cookie
    pub fn store_response_cookies(&self, headers: &HeaderMap, url: &Url) {
        let cookies = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| match value.to_str() {
                Ok(raw) => match Cookie::parse(raw.to_string()) {
                    Ok(cookie) => Some(cookie),
                    Err(e) => {
                        warn!("忽略无法解析的 Cookie: {}", e);
                        None
                    }
                },
                Err(_) => None,
            })
            .collect::<Vec<_>>();

        if cookies.is_empty() {
            return;
        }
        debug!("保存 {} 个 Cookie", cookies.len());
        self.store().store_response_cookies(cookies.into_iter(), url);
    }

    /// 是否持有某个地址可用的认证 Cookie
    pub fn has_credential(&self, url: &Url) -> bool {
        self.store()
            .get_request_values(url)
            .any(|(name, _)| name == AUTH_COOKIE_NAME)
    }

    fn store(&self) -> std::sync::MutexGuard<'_, CookieStore> {
        match self.inner.cookie_store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn account_guard(&self) -> std::sync::MutexGuard<'_, Option<Account>> {
        match self.inner.account.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn url() -> Url {
        Url::parse("http://localhost:8081/api/v1/tasks").unwrap()
    }

    #[test]
    fn stores_and_replays_auth_cookie() {
        let session = Session::new();
        assert!(session.cookie_header(&url()).is_none());

        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("IDM_AUTH=token-1; Path=/; HttpOnly"),
        );
        session.store_response_cookies(&headers, &url());

        assert!(session.has_credential(&url()));
        assert_eq!(session.cookie_header(&url()).as_deref(), Some("IDM_AUTH=token-1"));

        // 同名 Cookie 被替换，不会并存
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("IDM_AUTH=token-2; Path=/"));
        session.store_response_cookies(&headers, &url());
        assert_eq!(session.cookie_header(&url()).as_deref(), Some("IDM_AUTH=token-2"));
    }

    #[test]
    fn clear_drops_cookie_and_account() {
        let session = Session::new();
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("IDM_AUTH=abc; Path=/"));
        session.store_response_cookies(&headers, &url());
        session.establish(Account {
            id: Some("1".into()),
            account_name: Some("alice".into()),
        });

        let shared = session.clone();
        shared.clear();

        assert!(!session.is_authenticated());
        assert!(!session.has_credential(&url()));
    }
}
