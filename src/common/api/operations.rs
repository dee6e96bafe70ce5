//! 声明式的接口表
//!
//! 每个远程能力只是一条 [`Operation`] 描述：方法、路径模板、必需字段和响应类型。
//! [`IdmApi::dispatch`] 是唯一的执行入口，先同步校验参数，校验通过才返回一个待完成的调用。

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::client::{ApiRequest, ApiResponse, IdmClient, JSON, ResponseShape};
use super::error::ApiError;
use super::models::account::{
    CreateAccountRequest, CreateAccountResponse, CreateSessionRequest, CreateSessionResponse,
};
use super::models::task::{
    CreateDownloadTaskRequest, CreateDownloadTaskResponse, DownloadTaskPage, FileResult,
    ListQuery, UpdateDownloadTaskBody, UpdateDownloadTaskResponse,
};
use crate::auth::session::Session;
use crate::common::config::ClientConfig;

pub const TASK_ID: &str = "downloadTaskId";

/// 一个必需字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// 路径参数，不能缺失也不能为空串
    Path(&'static str),
    /// 请求体顶层字段，不能缺失也不能为 null
    Body(&'static str),
    /// 请求体中至少要有其中一个字段
    AnyOf(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub required: &'static [Requirement],
    pub content_type: Option<&'static str>,
    pub response: ResponseShape,
}

pub static CREATE_ACCOUNT: Operation = Operation {
    name: "createAccount",
    method: Method::POST,
    path: "/api/v1/accounts",
    required: &[Requirement::Body("accountName"), Requirement::Body("password")],
    content_type: Some(JSON),
    response: ResponseShape::Model,
};

pub static CREATE_SESSION: Operation = Operation {
    name: "createSession",
    method: Method::POST,
    path: "/api/v1/sessions",
    required: &[Requirement::Body("accountName"), Requirement::Body("password")],
    content_type: Some(JSON),
    response: ResponseShape::Model,
};

pub static DELETE_SESSION: Operation = Operation {
    name: "deleteSession",
    method: Method::DELETE,
    path: "/api/v1/sessions",
    required: &[],
    content_type: None,
    response: ResponseShape::Passthrough,
};

pub static CREATE_DOWNLOAD_TASK: Operation = Operation {
    name: "createDownloadTask",
    method: Method::POST,
    path: "/api/v1/tasks",
    required: &[Requirement::Body("url"), Requirement::Body("downloadType")],
    content_type: Some(JSON),
    response: ResponseShape::Model,
};

pub static LIST_DOWNLOAD_TASKS: Operation = Operation {
    name: "listDownloadTasks",
    method: Method::GET,
    path: "/api/v1/tasks",
    required: &[],
    content_type: None,
    response: ResponseShape::Model,
};

pub static UPDATE_DOWNLOAD_TASK: Operation = Operation {
    name: "updateDownloadTask",
    method: Method::PUT,
    path: "/api/v1/tasks/{downloadTaskId}",
    required: &[
        Requirement::Path(TASK_ID),
        Requirement::AnyOf(&["downloadStatus", "metadata"]),
    ],
    content_type: Some(JSON),
    response: ResponseShape::Model,
};

pub static DELETE_DOWNLOAD_TASK: Operation = Operation {
    name: "deleteDownloadTask",
    method: Method::DELETE,
    path: "/api/v1/tasks/{downloadTaskId}",
    required: &[Requirement::Path(TASK_ID)],
    content_type: None,
    response: ResponseShape::Passthrough,
};

pub static GET_DOWNLOAD_TASK_FILE: Operation = Operation {
    name: "getDownloadTaskFile",
    method: Method::GET,
    path: "/api/v1/tasks/{downloadTaskId}/files",
    required: &[Requirement::Path(TASK_ID)],
    content_type: None,
    response: ResponseShape::Envelope,
};

pub static OPERATIONS: &[&Operation] = &[
    &CREATE_ACCOUNT,
    &CREATE_SESSION,
    &DELETE_SESSION,
    &CREATE_DOWNLOAD_TASK,
    &LIST_DOWNLOAD_TASKS,
    &UPDATE_DOWNLOAD_TASK,
    &DELETE_DOWNLOAD_TASK,
    &GET_DOWNLOAD_TASK_FILE,
];

/// 调用方给出的参数
#[derive(Debug, Clone, Default)]
pub struct OperationArgs {
    pub path: BTreeMap<&'static str, Option<String>>,
    pub query: Vec<(&'static str, Option<String>)>,
    pub body: Option<Value>,
}

impl OperationArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, name: &'static str, value: Option<&str>) -> Self {
        self.path.insert(name, value.map(str::to_string));
        self
    }

    pub fn query(mut self, name: &'static str, value: Option<String>) -> Self {
        self.query.push((name, value));
        self
    }

    pub fn body<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidParameter(format!("请求体序列化失败: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

impl Operation {
    /// 校验必需字段并生成传输层请求，不做任何 I/O
    pub fn prepare(&self, args: OperationArgs) -> Result<ApiRequest, ApiError> {
        for requirement in self.required {
            match requirement {
                Requirement::Path(name) => {
                    let present = args
                        .path
                        .get(name)
                        .and_then(|v| v.as_deref())
                        .is_some_and(|v| !v.is_empty());
                    if !present {
                        return Err(ApiError::missing(*name, self.name));
                    }
                }
                Requirement::Body(field) => {
                    if !body_has(&args.body, field) {
                        return Err(ApiError::missing(*field, self.name));
                    }
                }
                Requirement::AnyOf(fields) => {
                    if !fields.iter().any(|field| body_has(&args.body, field)) {
                        return Err(ApiError::missing(fields.join("|"), self.name));
                    }
                }
            }
        }

        let mut request = ApiRequest::new(self.method.clone(), self.path).shape(self.response);
        for (name, value) in args.path {
            if let Some(value) = value {
                request = request.path_param(name, value);
            }
        }
        for (name, value) in args.query {
            request = request.query_param(name, value);
        }
        if let Some(body) = args.body {
            request.body = Some(body);
            request.content_type = self.content_type;
        }
        Ok(request)
    }
}

fn body_has(body: &Option<Value>, field: &str) -> bool {
    body.as_ref()
        .and_then(|b| b.get(field))
        .is_some_and(|v| !v.is_null())
}

/// 参数校验通过之后才会得到的待完成调用
pub type Call<'a, T> = BoxFuture<'a, Result<ApiResponse<T>, ApiError>>;

/// IDM 服务的全部接口
#[derive(Debug, Clone)]
pub struct IdmApi {
    client: IdmClient,
}

impl IdmApi {
    pub fn new(client: IdmClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::new(IdmClient::new(config)?))
    }

    pub fn client(&self) -> &IdmClient {
        &self.client
    }

    /// 唯一的执行入口：校验失败立即返回错误，不会发出请求
    pub fn dispatch<'a, T>(
        &'a self,
        session: &'a Session,
        operation: &Operation,
        args: OperationArgs,
    ) -> Result<Call<'a, T>, ApiError>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let request = operation.prepare(args)?;
        debug!("调用 {}", operation.name);
        Ok(Box::pin(self.client.execute::<T>(session, request)))
    }

    pub fn create_account<'a>(
        &'a self,
        session: &'a Session,
        request: &CreateAccountRequest,
    ) -> Result<Call<'a, CreateAccountResponse>, ApiError> {
        self.dispatch(session, &CREATE_ACCOUNT, OperationArgs::new().body(request)?)
    }

    pub fn create_session<'a>(
        &'a self,
        session: &'a Session,
        request: &CreateSessionRequest,
    ) -> Result<Call<'a, CreateSessionResponse>, ApiError> {
        self.dispatch(session, &CREATE_SESSION, OperationArgs::new().body(request)?)
    }

    pub fn delete_session<'a>(&'a self, session: &'a Session) -> Result<Call<'a, Value>, ApiError> {
        self.dispatch(session, &DELETE_SESSION, OperationArgs::new())
    }

    pub fn create_download_task<'a>(
        &'a self,
        session: &'a Session,
        request: &CreateDownloadTaskRequest,
    ) -> Result<Call<'a, CreateDownloadTaskResponse>, ApiError> {
        self.dispatch(
            session,
            &CREATE_DOWNLOAD_TASK,
            OperationArgs::new().body(request)?,
        )
    }

    pub fn list_download_tasks<'a>(
        &'a self,
        session: &'a Session,
        query: ListQuery,
    ) -> Result<Call<'a, DownloadTaskPage>, ApiError> {
        let args = OperationArgs::new()
            .query("offset", query.offset.map(|v| v.to_string()))
            .query("limit", query.limit.map(|v| v.to_string()));
        self.dispatch(session, &LIST_DOWNLOAD_TASKS, args)
    }

    pub fn update_download_task<'a>(
        &'a self,
        session: &'a Session,
        download_task_id: Option<&str>,
        body: &UpdateDownloadTaskBody,
    ) -> Result<Call<'a, UpdateDownloadTaskResponse>, ApiError> {
        let args = OperationArgs::new()
            .path(TASK_ID, download_task_id)
            .body(body)?;
        self.dispatch(session, &UPDATE_DOWNLOAD_TASK, args)
    }

    pub fn delete_download_task<'a>(
        &'a self,
        session: &'a Session,
        download_task_id: Option<&str>,
    ) -> Result<Call<'a, Value>, ApiError> {
        self.dispatch(
            session,
            &DELETE_DOWNLOAD_TASK,
            OperationArgs::new().path(TASK_ID, download_task_id),
        )
    }

    pub fn get_download_task_file<'a>(
        &'a self,
        session: &'a Session,
        download_task_id: Option<&str>,
    ) -> Result<Call<'a, FileResult>, ApiError> {
        self.dispatch(
            session,
            &GET_DOWNLOAD_TASK_FILE,
            OperationArgs::new().path(TASK_ID, download_task_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::api::models::account::Credentials;
    use crate::common::api::models::task::DownloadStatus;

    #[test]
    fn table_covers_every_operation_once() {
        let mut names = OPERATIONS.iter().map(|op| op.name).collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn missing_body_field_names_param_and_operation() {
        let creds = Credentials {
            account_name: Some("alice".into()),
            password: None,
        };
        let args = OperationArgs::new().body(&creds).unwrap();
        match CREATE_SESSION.prepare(args) {
            Err(ApiError::MissingParameter { param, operation }) => {
                assert_eq!(param, "password");
                assert_eq!(operation, "createSession");
            }
            other => panic!("期望 MissingParameter, 实际: {:?}", other),
        }
    }

    #[test]
    fn empty_path_param_counts_as_missing() {
        let args = OperationArgs::new().path(TASK_ID, Some(""));
        assert!(matches!(
            DELETE_DOWNLOAD_TASK.prepare(args),
            Err(ApiError::MissingParameter { .. })
        ));
    }

    #[test]
    fn update_needs_status_or_metadata() {
        let args = OperationArgs::new()
            .path(TASK_ID, Some("3"))
            .body(&UpdateDownloadTaskBody::default())
            .unwrap();
        assert!(UPDATE_DOWNLOAD_TASK.prepare(args).is_err());

        let body = UpdateDownloadTaskBody {
            download_status: Some(DownloadStatus::Pending),
            metadata: None,
        };
        let args = OperationArgs::new()
            .path(TASK_ID, Some("3"))
            .body(&body)
            .unwrap();
        let request = UPDATE_DOWNLOAD_TASK.prepare(args).unwrap();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path_params.get(TASK_ID).map(String::as_str), Some("3"));
        assert_eq!(request.content_type, Some(JSON));
    }

    #[test]
    fn get_without_body_sends_no_content_type() {
        let request = LIST_DOWNLOAD_TASKS.prepare(OperationArgs::new()).unwrap();
        assert!(request.body.is_none());
        assert!(request.content_type.is_none());
    }
}
