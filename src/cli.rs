use clap::Parser;
use std::path::PathBuf;

use idm_client::common::config::DEFAULT_TIMEOUT_SECS;
use idm_client::pagination::DEFAULT_PAGE_SIZE;

/// IDM 下载管理服务的终端客户端
#[derive(Parser, Debug)]
#[command(name = "idmdl")]
#[command(version)]
#[command(about = "IDM 下载管理服务的终端客户端", long_about = None)]
pub struct Cli {
    /// 服务地址
    #[arg(long, value_name = "URL", env = "IDM_BASE_URL")]
    #[arg(default_value = idm_client::common::config::DEFAULT_BASE_URL)]
    #[arg(value_hint = clap::ValueHint::Url)]
    pub base_url: String,

    /// 每页显示的任务数
    #[arg(long, value_name = "N", env = "IDM_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u64,

    /// 文件保存目录
    #[arg(long, value_name = "DIR", env = "IDM_OUTPUT_DIR", default_value = ".")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output_dir: PathBuf,

    /// 请求超时（秒）
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// 不携带会话 Cookie
    #[arg(long)]
    pub omit_credentials: bool,

    /// 输出调试日志
    #[arg(short, long)]
    pub verbose: bool,
}

/// 交互式命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { account_name: String, password: String },
    Login { account_name: String, password: String },
    Logout,
    WhoAmI,
    New { url: String, download_type: String },
    List,
    Next,
    Prev,
    Page(u64),
    Update { id: String, status: Option<String>, metadata: Option<String> },
    Delete(String),
    Fetch(String),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(None);
        };
        let args = parts.collect::<Vec<_>>();
        let arg = |i: usize, what: &str| -> Result<String, String> {
            args.get(i)
                .map(|s| s.to_string())
                .ok_or_else(|| format!("缺少参数: {}", what))
        };

        let command = match name {
            "register" => Command::Register {
                account_name: arg(0, "账户名")?,
                password: arg(1, "密码")?,
            },
            "login" => Command::Login {
                account_name: arg(0, "账户名")?,
                password: arg(1, "密码")?,
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "new" => Command::New {
                url: arg(0, "URL")?,
                download_type: args.get(1).unwrap_or(&"HTTP").to_string(),
            },
            "list" | "ls" => Command::List,
            "next" => Command::Next,
            "prev" => Command::Prev,
            "page" => Command::Page(
                arg(0, "页码")?
                    .parse()
                    .map_err(|e| format!("无效的页码: {}", e))?,
            ),
            "update" => {
                let id = arg(0, "任务ID")?;
                let status = args.get(1).filter(|s| **s != "-").map(|s| s.to_string());
                // 元数据原样取自状态之后的剩余部分，不重新拼接空白
                let metadata = split_token(line)
                    .and_then(|(_, rest)| split_token(rest))
                    .and_then(|(_, rest)| split_token(rest))
                    .map(|(_, rest)| rest.trim_start())
                    .filter(|rest| !rest.is_empty())
                    .map(str::to_string);
                Command::Update { id, status, metadata }
            }
            "delete" | "rm" => Command::Delete(arg(0, "任务ID")?),
            "fetch" | "get" => Command::Fetch(arg(0, "任务ID")?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("未知命令: {}，输入 help 查看帮助", other)),
        };
        Ok(Some(command))
    }
}

/// 切出开头的一个词，返回这个词和紧跟其后的原始剩余部分
fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some(s.split_at(end))
}

pub const HELP: &str = "\
register <账户名> <密码>          注册账户
login <账户名> <密码>             登录
logout                            退出登录
whoami                            当前登录的账户
new <url> [HTTP]                  新建下载任务
list                              刷新当前页
next | prev                       下一页 / 上一页
page <n>                          跳到第 n 页
update <id> <状态|-> [元数据]     更新任务状态或元数据
delete <id>                       删除任务
fetch <id>                        保存已完成任务的文件
help                              显示帮助
quit                              退出";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(
            Command::parse("login alice secret").unwrap(),
            Some(Command::Login {
                account_name: "alice".into(),
                password: "secret".into()
            })
        );
        assert_eq!(
            Command::parse("new https://example.com/a.iso").unwrap(),
            Some(Command::New {
                url: "https://example.com/a.iso".into(),
                download_type: "HTTP".into()
            })
        );
        assert_eq!(
            Command::parse("update 3 - {\"k\": 1}").unwrap(),
            Some(Command::Update {
                id: "3".into(),
                status: None,
                metadata: Some("{\"k\": 1}".into())
            })
        );
        assert_eq!(
            Command::parse("update 4 Failed").unwrap(),
            Some(Command::Update {
                id: "4".into(),
                status: Some("Failed".into()),
                metadata: None
            })
        );
        assert_eq!(Command::parse("page 2").unwrap(), Some(Command::Page(2)));
        assert!(Command::parse("page two").is_err());
        assert!(Command::parse("login alice").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn update_keeps_metadata_whitespace() {
        assert_eq!(
            Command::parse("  update\t3  Success   {\"a\":  \"x\ty\"}  ").unwrap(),
            Some(Command::Update {
                id: "3".into(),
                status: Some("Success".into()),
                metadata: Some("{\"a\":  \"x\ty\"}  ".into())
            })
        );
    }
}
