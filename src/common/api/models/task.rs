use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::account::Account;
use super::common::{StreamResult, count, count_as_string, opt_id};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadType {
    #[default]
    UndefinedType,
    #[serde(rename = "HTTP")]
    Http,
}

impl DownloadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadType::UndefinedType => "UndefinedType",
            DownloadType::Http => "HTTP",
        }
    }
}

impl fmt::Display for DownloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UndefinedType" => Ok(DownloadType::UndefinedType),
            "HTTP" | "http" => Ok(DownloadType::Http),
            _ => Err(format!("未知的下载类型: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadStatus {
    #[default]
    UndefinedStatus,
    Pending,
    Downloading,
    Failed,
    Success,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::UndefinedStatus => "UndefinedStatus",
            DownloadStatus::Pending => "Pending",
            DownloadStatus::Downloading => "Downloading",
            DownloadStatus::Failed => "Failed",
            DownloadStatus::Success => "Success",
        }
    }

    /// 只有下载成功的任务才能取回文件
    pub fn is_downloadable(&self) -> bool {
        match self {
            DownloadStatus::Success => true,
            DownloadStatus::UndefinedStatus
            | DownloadStatus::Pending
            | DownloadStatus::Downloading
            | DownloadStatus::Failed => false,
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UndefinedStatus" => Ok(DownloadStatus::UndefinedStatus),
            "Pending" => Ok(DownloadStatus::Pending),
            "Downloading" => Ok(DownloadStatus::Downloading),
            "Failed" => Ok(DownloadStatus::Failed),
            "Success" => Ok(DownloadStatus::Success),
            _ => Err(format!("未知的下载状态: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTask {
    #[serde(default, deserialize_with = "opt_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub of_account: Option<Account>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_type: Option<DownloadType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_status: Option<DownloadStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl DownloadTask {
    pub fn status(&self) -> DownloadStatus {
        self.download_status.unwrap_or_default()
    }
}

/// 一页下载任务，每次列表请求都会重新计算
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTaskPage {
    #[serde(default)]
    pub download_task_list: Vec<DownloadTask>,

    #[serde(default, deserialize_with = "count", serialize_with = "count_as_string")]
    pub total_download_task_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDownloadTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_type: Option<DownloadType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CreateDownloadTaskRequest {
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            download_type: Some(DownloadType::Http),
            url: Some(url.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDownloadTaskResponse {
    #[serde(default)]
    pub download_task: Option<DownloadTask>,
}

/// 更新请求体，状态和元数据至少要有一个
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDownloadTaskBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_status: Option<DownloadStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

pub type UpdateDownloadTaskResponse = CreateDownloadTaskResponse;

/// 列表查询参数，None 的字段不会出现在查询串里
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileData {
    pub data: String,
}

/// `{ "result": { "data": "<base64>" } }`
pub type FileResult = StreamResult<FileData>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enums_use_wire_strings() {
        assert_eq!(serde_json::to_value(DownloadType::Http).unwrap(), json!("HTTP"));
        assert_eq!(
            serde_json::from_value::<DownloadStatus>(json!("Downloading")).unwrap(),
            DownloadStatus::Downloading
        );
        assert!(serde_json::from_value::<DownloadStatus>(json!("Done")).is_err());
        assert_eq!("Success".parse::<DownloadStatus>(), Ok(DownloadStatus::Success));
    }

    #[test]
    fn page_accepts_service_encoding() {
        let page: DownloadTaskPage = serde_json::from_value(json!({
            "downloadTaskList": [{
                "id": "7",
                "ofAccount": { "id": "1", "accountName": "alice" },
                "downloadType": "HTTP",
                "url": "https://example.com/a.zip",
                "downloadStatus": "Pending",
                "metadata": "{}"
            }],
            "totalDownloadTaskCount": "11"
        }))
        .unwrap();

        assert_eq!(page.total_download_task_count, 11);
        assert_eq!(page.download_task_list[0].id.as_deref(), Some("7"));
        assert_eq!(page.download_task_list[0].status(), DownloadStatus::Pending);
    }

    #[test]
    fn page_with_omitted_fields_is_empty() {
        let page: DownloadTaskPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.download_task_list.is_empty());
        assert_eq!(page.total_download_task_count, 0);

        let page: DownloadTaskPage =
            serde_json::from_value(json!({ "totalDownloadTaskCount": 3 })).unwrap();
        assert_eq!(page.total_download_task_count, 3);

        assert!(
            serde_json::from_value::<DownloadTaskPage>(json!({ "totalDownloadTaskCount": "many" }))
                .is_err()
        );
    }

    #[test]
    fn file_result_is_strict() {
        assert!(
            serde_json::from_value::<FileResult>(json!({ "result": { "data": "aGk=" } })).is_ok()
        );
        assert!(serde_json::from_value::<FileResult>(json!({ "data": "aGk=" })).is_err());
        assert!(
            serde_json::from_value::<FileResult>(json!({ "result": { "data": "aGk=", "size": 2 } }))
                .is_err()
        );
    }
}
