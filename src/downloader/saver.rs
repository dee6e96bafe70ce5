use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use super::artifact::Blob;

/// 触发保存的目标，对应浏览器里点击下载链接
#[async_trait]
pub trait SaveTarget: Send + Sync {
    async fn save(&self, file_name: &str, blob: &Blob) -> std::io::Result<PathBuf>;
}

/// 保存到目录，同名文件不会被覆盖
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // download, download (1), download (2) ...
    fn candidate(&self, file_name: &str, n: u32) -> PathBuf {
        if n == 0 {
            return self.dir.join(file_name);
        }
        let name = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
            _ => format!("{} ({})", file_name, n),
        };
        self.dir.join(name)
    }

    /// 把写好的临时文件链接到第一个空闲的文件名上
    ///
    /// 硬链接在目标已存在时失败而不是替换，检查和占用是同一步。
    async fn publish(&self, temp_path: &Path, file_name: &str) -> std::io::Result<PathBuf> {
        let mut n = 0;
        loop {
            let candidate = self.candidate(file_name, n);
            match tokio::fs::hard_link(temp_path, &candidate).await {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl SaveTarget for DirectorySaver {
    async fn save(&self, file_name: &str, blob: &Blob) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // 先写临时文件，最终文件名下不会出现写了一半的文件
        let temp_path = self
            .dir
            .join(format!("{}.{}.part", file_name, Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&temp_path, blob.bytes()).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        let published = self.publish(&temp_path, file_name).await;
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            warn!("删除临时文件失败 {}: {}", temp_path.display(), e);
        }
        let path = published?;

        info!("文件已保存: {} ({} 字节)", path.display(), blob.len());
        Ok(path)
    }
}
