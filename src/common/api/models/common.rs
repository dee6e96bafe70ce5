use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 服务端错误响应体
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RpcStatus {
    pub code: Option<i32>,

    pub message: Option<String>,

    #[serde(default)]
    pub details: Vec<Value>,
}

/// 流式接口返回的信封 `{ "result": ... }`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamResult<T> {
    pub result: T,
}

// uint64 在 JSON 里以字符串传输，但也兼容数字
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

pub(crate) fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}

pub(crate) fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(0),
        Some(StringOrNumber::Number(n)) => Ok(n),
        Some(StringOrNumber::String(s)) if s.is_empty() => Ok(0),
        Some(StringOrNumber::String(s)) => s
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("无效的计数 '{}': {}", s, e))),
    }
}

pub(crate) fn count_as_string<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&value.to_string())
}
