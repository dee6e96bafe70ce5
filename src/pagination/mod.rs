//! 分页控制
//!
//! 页码从 1 开始；每次发出列表请求都会带一个递增的令牌，
//! 只有最新令牌对应的响应会被采纳，先发后到的旧响应直接丢弃。
//! 显示的页码只在响应被采纳时改变，请求失败时页码和列表都保持原样。

pub mod browser;

use crate::common::api::error::ApiError;
use crate::common::api::models::task::{DownloadTask, DownloadTaskPage, ListQuery};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// 已发出的一次列表请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub token: u64,
    pub page: u64,
    pub query: ListQuery,
}

/// 响应回来之后的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// 已经显示
    Applied,
    /// 已被更新的请求取代，丢弃
    Stale,
    /// 请求的页超出了总页数，应改为获取这一页
    OutOfRange { page: u64 },
}

#[derive(Debug, Clone)]
pub struct Paginator {
    limit: u64,
    page: u64,
    total_count: u64,
    tasks: Vec<DownloadTask>,
    latest_token: u64,
}

impl Paginator {
    pub fn new(limit: u64) -> Result<Self, ApiError> {
        if limit == 0 {
            return Err(ApiError::InvalidParameter("每页数量必须大于 0".to_string()));
        }
        Ok(Self {
            limit,
            page: 1,
            total_count: 0,
            tasks: Vec::new(),
            latest_token: 0,
        })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.total_count, self.limit)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// 当前页对应的 offset/limit
    pub fn query(&self) -> ListQuery {
        self.query_for(self.page)
    }

    fn query_for(&self, page: u64) -> ListQuery {
        ListQuery {
            offset: Some(offset_for(page, self.limit)),
            limit: Some(self.limit),
        }
    }

    fn request_page(&mut self, page: u64) -> PageRequest {
        self.latest_token += 1;
        PageRequest {
            token: self.latest_token,
            page,
            query: self.query_for(page),
        }
    }

    /// 为当前页发出一次新请求
    pub fn request_current(&mut self) -> PageRequest {
        self.request_page(self.page)
    }

    pub fn next(&mut self) -> Option<PageRequest> {
        if !self.has_next() {
            return None;
        }
        Some(self.request_page(self.page + 1))
    }

    pub fn previous(&mut self) -> Option<PageRequest> {
        if !self.has_previous() {
            return None;
        }
        Some(self.request_page(self.page - 1))
    }

    pub fn go_to(&mut self, page: u64) -> Result<PageRequest, ApiError> {
        if page == 0 {
            return Err(ApiError::InvalidParameter("页码从 1 开始".to_string()));
        }
        Ok(self.request_page(page))
    }

    pub fn is_current(&self, request: &PageRequest) -> bool {
        request.token == self.latest_token
    }

    /// 采纳一次响应；不是最新请求的响应一律丢弃，不会与当前列表合并
    ///
    /// 请求的页超出总页数时什么都不采纳，返回应当改为获取的最后一页。
    pub fn apply(&mut self, request: &PageRequest, page: DownloadTaskPage) -> PageOutcome {
        if !self.is_current(request) {
            return PageOutcome::Stale;
        }

        let last_page = total_pages(page.total_download_task_count, self.limit).max(1);
        if request.page > last_page {
            return PageOutcome::OutOfRange { page: last_page };
        }

        self.page = request.page;
        self.total_count = page.total_download_task_count;
        self.tasks = page.download_task_list;
        PageOutcome::Applied
    }
}

/// `offset = (page - 1) * limit`
pub fn offset_for(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit)
}

/// `ceil(total / limit)`，total 为 0 时为 0
pub fn total_pages(total_count: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total_count.div_ceil(limit)
}
