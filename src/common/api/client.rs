use std::collections::BTreeMap;

use reqwest::{
    Client, ClientBuilder, Method, Response, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use super::error::ApiError;
use crate::auth::session::Session;
use crate::common::config::{ClientConfig, CredentialsPolicy};

pub const JSON: &str = "application/json";
pub const FORM: &str = "application/x-www-form-urlencoded";

/// 响应体按声明的类型解码，不看内容猜类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// 反序列化成声明的模型
    Model,
    /// 原样返回 JSON，空响应视为 `{}`
    Passthrough,
    /// 只允许 `{ "result": ... }` 一个键
    Envelope,
}

/// 一次调用需要的全部信息
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path_template: String,
    pub method: Method,
    pub path_params: BTreeMap<String, String>,
    pub query_params: Vec<(String, Option<String>)>,
    pub headers: HeaderMap,
    pub form_params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub content_type: Option<&'static str>,
    pub accepts: Vec<&'static str>,
    pub response_shape: ResponseShape,
}

impl ApiRequest {
    pub fn new(method: Method, path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
            method,
            path_params: BTreeMap::new(),
            query_params: Vec::new(),
            headers: HeaderMap::new(),
            form_params: Vec::new(),
            body: None,
            content_type: None,
            accepts: vec![JSON],
            response_shape: ResponseShape::Model,
        }
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.query_params.push((name.into(), value));
        self
    }

    pub fn form_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_params.push((name.into(), value.into()));
        self.content_type = Some(FORM);
        self
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self.content_type = Some(JSON);
        self
    }

    pub fn shape(mut self, shape: ResponseShape) -> Self {
        self.response_shape = shape;
        self
    }
}

/// 原始响应，成功时和解码后的数据一起返回
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub raw: RawResponse,
}

// IDM 服务的传输层客户端
#[derive(Debug, Clone)]
pub struct IdmClient {
    inner: Client,
    config: ClientConfig,
}

impl IdmClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        // Cookie 由会话句柄管理，这里不挂 cookie_provider
        let inner = ClientBuilder::new()
            .timeout(config.timeout)
            .default_headers(Self::get_default_headers(&config))
            .build()?;
        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn get_default_headers(config: &ClientConfig) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        headers
    }

    /// 把路径模板、路径参数和查询参数拼成完整地址
    pub fn build_url(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut path = request.path_template.clone();
        for (name, value) in &request.path_params {
            let placeholder = format!("{{{}}}", name);
            path = path.replace(&placeholder, &urlencoding::encode(value));
        }
        if let Some(name) = unresolved_placeholder(&path) {
            return Err(ApiError::missing(name, request.path_template.clone()));
        }

        let base = self.config.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, path))
            .map_err(|e| ApiError::InvalidParameter(format!("无效的请求地址 {}: {}", path, e)))?;

        let pairs = request
            .query_params
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v.as_str())))
            .collect::<Vec<_>>();
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            let query = serde_urlencoded::to_string(&pairs)
                .map_err(|e| ApiError::InvalidParameter(format!("查询参数编码失败: {}", e)))?;
            url.set_query(Some(&query));
        }

        Ok(url)
    }

    // 通用请求
    pub async fn execute<T: DeserializeOwned>(
        &self,
        session: &Session,
        request: ApiRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = self.build_url(&request)?;
        debug!("{} {}", request.method, url);

        let mut builder = self
            .inner
            .request(request.method.clone(), url.clone())
            .headers(request.headers.clone());

        if !request.accepts.is_empty() {
            builder = builder.header(ACCEPT, request.accepts.join(", "));
        }

        if self.config.credentials == CredentialsPolicy::Include {
            if let Some(cookie) = session.cookie_header(&url) {
                builder = builder.header(COOKIE, cookie);
            }
        }

        match (request.content_type, &request.body) {
            (Some(JSON), Some(body)) => builder = builder.json(body),
            (Some(FORM), _) if !request.form_params.is_empty() => {
                builder = builder.form(&request.form_params)
            }
            (Some(content_type), Some(body)) => {
                builder = builder
                    .header(CONTENT_TYPE, content_type)
                    .body(serde_json::to_vec(body)?)
            }
            _ => {}
        }

        let resp = builder.send().await.map_err(|e| {
            error!("请求失败: {} {}: {}", request.method, url, e);
            ApiError::Reqwest(e)
        })?;

        if self.config.credentials == CredentialsPolicy::Include {
            session.store_response_cookies(resp.headers(), &url);
        }

        Self::handle_response(resp, request.response_shape).await
    }

    // 处理响应
    async fn handle_response<T: DeserializeOwned>(
        resp: Response,
        shape: ResponseShape,
    ) -> Result<ApiResponse<T>, ApiError> {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await?;

        if !status.is_success() {
            error!("服务返回错误状态 {}: {}", status, body);
            return Err(ApiError::Status { status, body });
        }

        let data = decode::<T>(shape, &body)?;
        Ok(ApiResponse {
            data,
            raw: RawResponse {
                status,
                headers,
                body,
            },
        })
    }
}

/// 按声明的响应类型解码
pub fn decode<T: DeserializeOwned>(shape: ResponseShape, body: &str) -> Result<T, ApiError> {
    match shape {
        ResponseShape::Model => serde_json::from_str::<T>(body).map_err(|e| {
            ApiError::InvalidResponse(format!("解析响应失败: {}. 原始响应: {}", e, body))
        }),
        ResponseShape::Passthrough => {
            let value = if body.trim().is_empty() {
                Value::Object(serde_json::Map::new())
            } else {
                serde_json::from_str::<Value>(body)?
            };
            Ok(serde_json::from_value::<T>(value)?)
        }
        ResponseShape::Envelope => {
            let value = serde_json::from_str::<Value>(body)?;
            match value.as_object() {
                Some(object) if object.len() == 1 && object.contains_key("result") => {
                    Ok(serde_json::from_value::<T>(value)?)
                }
                _ => Err(ApiError::InvalidResponse(format!(
                    "响应不是 result 信封: {}",
                    body
                ))),
            }
        }
    }
}

fn unresolved_placeholder(path: &str) -> Option<String> {
    let start = path.find('{')?;
    let end = path[start..].find('}')?;
    Some(path[start + 1..start + end].to_string())
}
