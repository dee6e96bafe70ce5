use serde::{Deserialize, Serialize};

use super::common::opt_id;

/// 账户最短/最长长度，与注册表单一致
pub const ACCOUNT_NAME_MIN_LEN: usize = 3;
pub const ACCOUNT_NAME_MAX_LEN: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default, deserialize_with = "opt_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

/// 注册和登录共用的请求体，字段缺失时不会被序列化
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(account_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account_name: Some(account_name.into()),
            password: Some(password.into()),
        }
    }
}

pub type CreateAccountRequest = Credentials;
pub type CreateSessionRequest = Credentials;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    #[serde(default, deserialize_with = "opt_id")]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    #[serde(default)]
    pub account: Option<Account>,
}
