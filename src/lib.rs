//! IDM 下载管理服务的客户端核心。
//!
//! 传输层、声明式的接口表、分页控制以及下载文件的落地都在这里，
//! 终端前端 `idmdl` 只是调用这些接口并渲染结果。

pub mod auth;
pub mod common;
pub mod downloader;
pub mod pagination;

pub use auth::AuthManager;
pub use auth::session::Session;
pub use common::api::client::IdmClient;
pub use common::api::error::{ApiError, ErrorKind};
pub use common::api::operations::IdmApi;
pub use common::config::{ClientConfig, CredentialsPolicy};
