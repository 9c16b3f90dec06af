//! 文件重组事件日志
//!
//! 纯文本，每个跳过/重复/错误事件一行。运维人员会用 grep 检索这些行，格式需保持稳定。

use pacs_core::Result;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// 事件日志写入器
pub struct EventLog {
    writer: BufWriter<File>,
    path: PathBuf,
    lines: usize,
}

impl EventLog {
    /// 创建（或截断）日志文件，父目录不存在时自动创建
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = File::create(&path).await?;
        debug!("事件日志: {}", path.display());

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            lines: 0,
        })
    }

    /// 追加一行
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.lines += 1;
        Ok(())
    }

    /// 已写入的行数
    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// 日志文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 刷新并关闭
    pub async fn finish(mut self) -> Result<usize> {
        self.writer.flush().await?;
        self.writer.into_inner().sync_all().await?;
        Ok(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_log_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs/organize_log.txt");

        let mut log = EventLog::create(&path).await.unwrap();
        log.write_line("Duplicate file skipped: a -> b").await.unwrap();
        log.write_line("Error processing file c: boom").await.unwrap();
        assert_eq!(log.line_count(), 2);
        assert_eq!(log.finish().await.unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Duplicate file skipped: a -> b\nError processing file c: boom\n");
    }

    #[tokio::test]
    async fn test_event_log_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "stale\n").unwrap();

        let log = EventLog::create(&path).await.unwrap();
        assert_eq!(log.path(), path.as_path());
        log.finish().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
