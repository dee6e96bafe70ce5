use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::{PageOutcome, PageRequest, Paginator};
use crate::auth::session::Session;
use crate::common::api::error::ApiError;
use crate::common::api::models::task::DownloadTask;
use crate::common::api::operations::IdmApi;

/// 渲染用的当前页快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub page: u64,
    pub total_pages: u64,
    pub total_count: u64,
    pub tasks: Vec<DownloadTask>,
    pub has_next: bool,
    pub has_previous: bool,
}

/// 任务列表页：分页状态 + 列表接口
///
/// 所有方法只需要 `&self`，可以同时发出多次翻页，最后发出的那次获胜。
#[derive(Debug)]
pub struct TaskBrowser {
    api: IdmApi,
    session: Session,
    state: Mutex<Paginator>,
}

impl TaskBrowser {
    pub fn new(api: IdmApi, session: Session, limit: u64) -> Result<Self, ApiError> {
        Ok(Self {
            api,
            session,
            state: Mutex::new(Paginator::new(limit)?),
        })
    }

    pub fn view(&self) -> PageView {
        let state = self.state();
        PageView {
            page: state.page(),
            total_pages: state.total_pages(),
            total_count: state.total_count(),
            tasks: state.tasks().to_vec(),
            has_next: state.has_next(),
            has_previous: state.has_previous(),
        }
    }

    /// 重新获取当前页
    pub async fn refresh(&self) -> Result<PageOutcome, ApiError> {
        let request = self.state().request_current();
        self.fetch(request).await
    }

    /// 下一页，不可翻页时返回 None 且不发请求
    pub async fn next_page(&self) -> Result<Option<PageOutcome>, ApiError> {
        let request = self.state().next();
        match request {
            Some(request) => self.fetch(request).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn previous_page(&self) -> Result<Option<PageOutcome>, ApiError> {
        let request = self.state().previous();
        match request {
            Some(request) => self.fetch(request).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn go_to_page(&self, page: u64) -> Result<PageOutcome, ApiError> {
        let request = self.state().go_to(page)?;
        self.fetch(request).await
    }

    async fn fetch(&self, mut request: PageRequest) -> Result<PageOutcome, ApiError> {
        loop {
            debug!("获取第 {} 页 (token {})", request.page, request.token);
            let result = match self.api.list_download_tasks(&self.session, request.query) {
                Ok(call) => call.await,
                Err(e) => Err(e),
            };

            let mut state = self.state();
            let resp = match result {
                Ok(resp) => resp,
                Err(e) if !state.is_current(&request) => {
                    warn!("丢弃已被取代的第 {} 页请求的错误: {}", request.page, e);
                    return Ok(PageOutcome::Stale);
                }
                // 显示的页和列表保持上一次采纳的结果
                Err(e) => return Err(e),
            };

            match state.apply(&request, resp.data) {
                PageOutcome::OutOfRange { page } => {
                    debug!("页码超出范围，改为获取第 {} 页", page);
                    request = state.go_to(page)?;
                }
                PageOutcome::Stale => {
                    warn!("丢弃已被取代的第 {} 页响应", request.page);
                    return Ok(PageOutcome::Stale);
                }
                PageOutcome::Applied => return Ok(PageOutcome::Applied),
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, Paginator> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
