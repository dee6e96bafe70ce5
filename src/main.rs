use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use idm_client::common::api::models::task::{
    CreateDownloadTaskRequest, DownloadStatus, DownloadTask, DownloadType, UpdateDownloadTaskBody,
};
use idm_client::common::logger::PrettyLogger;
use idm_client::downloader::FileMaterializer;
use idm_client::downloader::error::MaterializeError;
use idm_client::downloader::saver::DirectorySaver;
use idm_client::pagination::PageOutcome;
use idm_client::pagination::browser::TaskBrowser;
use idm_client::{
    ApiError, AuthManager, ClientConfig, CredentialsPolicy, IdmApi, Session, log_error, log_info,
    log_success, log_warning,
};

mod cli;

use cli::{Command, HELP};

/// 一次交互会话里用到的全部对象
struct App {
    auth: AuthManager,
    browser: TaskBrowser,
    materializer: FileMaterializer,
    saver: DirectorySaver,
}

impl App {
    fn new(args: &cli::Cli) -> Result<Self> {
        let credentials = if args.omit_credentials {
            CredentialsPolicy::Omit
        } else {
            CredentialsPolicy::Include
        };
        let config = ClientConfig::new(&args.base_url)?
            .with_credentials(credentials)
            .with_timeout(Duration::from_secs(args.timeout));

        let api = IdmApi::from_config(config).context("创建 HTTP 客户端失败")?;
        let session = Session::new();

        Ok(Self {
            auth: AuthManager::new(api.clone(), session.clone()),
            browser: TaskBrowser::new(api.clone(), session, args.page_size)?,
            materializer: FileMaterializer::new(api),
            saver: DirectorySaver::new(&args.output_dir),
        })
    }

    fn session(&self) -> &Session {
        self.auth.session()
    }

    fn api(&self) -> &IdmApi {
        self.auth.api()
    }

    /// 执行一条命令，返回 false 表示退出
    async fn handle(&self, command: Command) -> bool {
        let result = match command {
            Command::Quit => return false,
            Command::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Command::Register {
                account_name,
                password,
            } => self.register(&account_name, &password).await,
            Command::Login {
                account_name,
                password,
            } => self.login(&account_name, &password).await,
            Command::Logout => self.logout().await,
            Command::WhoAmI => {
                match self.session().account() {
                    Some(account) => PrettyLogger::user_status(
                        "已登录",
                        account.account_name.unwrap_or_default(),
                    ),
                    None => log_info!("未登录"),
                }
                Ok(())
            }
            Command::New { url, download_type } => self.create_task(url, &download_type).await,
            Command::List => self.show(self.browser.refresh().await.map(Some)),
            Command::Next => self.show(self.browser.next_page().await),
            Command::Prev => self.show(self.browser.previous_page().await),
            Command::Page(page) => self.show(self.browser.go_to_page(page).await.map(Some)),
            Command::Update {
                id,
                status,
                metadata,
            } => self.update_task(&id, status, metadata).await,
            Command::Delete(id) => self.delete_task(&id).await,
            Command::Fetch(id) => self.fetch_file(&id).await,
        };

        if let Err(e) = result {
            log_error!("{}", e);
        }
        true
    }

    async fn register(&self, account_name: &str, password: &str) -> Result<()> {
        let account_id = self
            .auth
            .register(account_name, password)
            .await
            .map_err(describe)?;
        log_success!("注册成功，账户 ID: {}，请登录", account_id);
        Ok(())
    }

    async fn login(&self, account_name: &str, password: &str) -> Result<()> {
        match self.auth.login(account_name, password).await {
            Ok(account) => {
                PrettyLogger::user_status("登录成功", account.account_name.unwrap_or_default());
                self.show(self.browser.refresh().await.map(Some))
            }
            // 被服务端拒绝时不暴露具体原因
            Err(e @ ApiError::Status { .. }) => {
                debug!("登录被拒绝: {}", e);
                Err(anyhow::anyhow!("账户名或密码错误"))
            }
            Err(e) => Err(describe(e)),
        }
    }

    async fn logout(&self) -> Result<()> {
        self.auth.logout().await.map_err(describe)?;
        log_success!("已退出登录");
        Ok(())
    }

    async fn create_task(&self, url: String, download_type: &str) -> Result<()> {
        let download_type = download_type
            .parse::<DownloadType>()
            .map_err(anyhow::Error::msg)?;
        let request = CreateDownloadTaskRequest {
            download_type: Some(download_type),
            url: Some(url),
        };
        let resp = self
            .api()
            .create_download_task(self.session(), &request)?
            .await
            .map_err(describe)?;
        let id = resp
            .data
            .download_task
            .and_then(|t| t.id)
            .unwrap_or_else(|| "-".to_string());
        log_success!("下载任务已创建: {}", id);
        Ok(())
    }

    async fn update_task(
        &self,
        id: &str,
        status: Option<String>,
        metadata: Option<String>,
    ) -> Result<()> {
        let download_status = status
            .map(|s| s.parse::<DownloadStatus>())
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let body = UpdateDownloadTaskBody {
            download_status,
            metadata,
        };
        let resp = self
            .api()
            .update_download_task(self.session(), Some(id), &body)?
            .await
            .map_err(describe)?;
        if let Some(task) = resp.data.download_task {
            PrettyLogger::task(&task);
        }
        log_success!("任务 {} 已更新", id);
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.api()
            .delete_download_task(self.session(), Some(id))?
            .await
            .map_err(describe)?;
        log_success!("任务 {} 已删除", id);
        self.show(self.browser.refresh().await.map(Some))
    }

    async fn fetch_file(&self, id: &str) -> Result<()> {
        // 只能取当前页里的任务，状态以最近一次列表响应为准
        let task: DownloadTask = self
            .browser
            .view()
            .tasks
            .into_iter()
            .find(|t| t.id.as_deref() == Some(id))
            .ok_or_else(|| anyhow::anyhow!("任务 {} 不在当前页，先用 list 刷新", id))?;

        match self
            .materializer
            .download(self.session(), &task, &self.saver)
            .await
        {
            Ok(saved) => {
                PrettyLogger::file_info("已保存", saved.path.display().to_string());
                Ok(())
            }
            Err(MaterializeError::Api(e)) => Err(describe(e)),
            Err(e) => Err(e.into()),
        }
    }

    fn show(&self, outcome: Result<Option<PageOutcome>, ApiError>) -> Result<()> {
        match outcome.map_err(describe)? {
            Some(PageOutcome::Stale) => log_warning!("列表已被更新的请求取代"),
            Some(_) => PrettyLogger::page(&self.browser.view()),
            None => log_info!("没有更多页了"),
        }
        Ok(())
    }
}

fn describe(e: ApiError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let app = App::new(&args)?;
    info!("服务地址: {}", args.base_url);
    PrettyLogger::title("IDM 下载管理");
    println!("服务地址: {}，输入 {} 查看命令", args.base_url.cyan(), "help".bold());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"idm> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match Command::parse(&line) {
            Ok(Some(command)) => {
                if !app.handle(command).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => log_error!("{}", e),
        }
    }

    Ok(())
}
