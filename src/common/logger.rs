use colored::*;

use crate::common::api::models::task::{DownloadStatus, DownloadTask};
use crate::pagination::browser::PageView;

/// 终端里给用户看的输出
pub struct PrettyLogger;

impl PrettyLogger {
    pub fn success(message: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), message.as_ref());
    }

    pub fn info(message: impl AsRef<str>) {
        println!("{} {}", "ℹ".blue().bold(), message.as_ref());
    }

    pub fn warning(message: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow().bold(), message.as_ref());
    }

    pub fn error(message: impl AsRef<str>) {
        println!("{} {}", "✗".red().bold(), message.as_ref());
    }

    /// 显示文件信息
    pub fn file_info(label: impl AsRef<str>, path: impl AsRef<str>) {
        println!("{} {}: {}", "📁".blue().bold(), label.as_ref().bold(), path.as_ref());
    }

    /// 显示用户状态
    pub fn user_status(status: impl AsRef<str>, details: impl AsRef<str>) {
        println!("{} {} - {}", "👤".green().bold(), status.as_ref().bold(), details.as_ref());
    }

    pub fn separator() {
        println!("{}", "─".repeat(50).bright_black());
    }

    pub fn title(text: impl AsRef<str>) {
        let text = text.as_ref();
        let width = text.chars().count().min(48);
        let padding = (48 - width) / 2;
        println!(
            "{} {} {}",
            "─".repeat(padding).bright_black(),
            text.bold(),
            "─".repeat(48 - padding - width).bright_black()
        );
    }

    pub fn task(task: &DownloadTask) {
        let status = task.status();
        let colored_status = match status {
            DownloadStatus::Success => status.as_str().green(),
            DownloadStatus::Failed => status.as_str().red(),
            DownloadStatus::Downloading => status.as_str().cyan(),
            DownloadStatus::Pending => status.as_str().yellow(),
            DownloadStatus::UndefinedStatus => status.as_str().bright_black(),
        };
        println!(
            "  {} {:<6} {:<12} {}",
            "•".blue(),
            task.id.as_deref().unwrap_or("-"),
            colored_status,
            task.url.as_deref().unwrap_or("")
        );
    }

    /// 一整页任务，以及翻页提示
    pub fn page(view: &PageView) {
        Self::title("下载任务");
        if view.tasks.is_empty() {
            println!("  {}", "(空)".bright_black());
        }
        for task in &view.tasks {
            Self::task(task);
        }
        Self::separator();

        let mut hints = Vec::new();
        if view.has_previous {
            hints.push("prev");
        }
        if view.has_next {
            hints.push("next");
        }
        println!(
            "当前页: {} / 总页数: {}  (共 {} 个任务) {}",
            view.page,
            view.total_pages,
            view.total_count,
            hints.join(" | ").cyan()
        );
    }
}

/// 便捷宏用于漂亮的日志输出
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::success(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::warning(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::error(format!($($arg)*))
    };
}
