//! 影像存储布局与文件放置

use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// 目标目录布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryLayout {
    /// `<根>/<患者ID>/<检查UID>/<序列UID>/<文件名>`
    #[default]
    PatientStudySeries,
    /// `<根>/<患者ID>/<检查UID>/<文件名>`
    PatientStudy,
}

impl DirectoryLayout {
    /// 布局是否需要序列UID
    pub fn requires_series(&self) -> bool {
        matches!(self, DirectoryLayout::PatientStudySeries)
    }

    /// 计算目标目录
    pub fn target_dir(&self, root: &Path, patient_id: &str, study_uid: &str, series_uid: Option<&str>) -> PathBuf {
        let mut dir = root.join(sanitize_component(patient_id)).join(sanitize_component(study_uid));
        if let (DirectoryLayout::PatientStudySeries, Some(series)) = (self, series_uid) {
            dir.push(sanitize_component(series));
        }
        dir
    }
}

impl FromStr for DirectoryLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "patient_study_series" | "series" => Ok(DirectoryLayout::PatientStudySeries),
            "patient_study" | "study" => Ok(DirectoryLayout::PatientStudy),
            other => Err(format!("未知的目录布局: {}", other)),
        }
    }
}

/// 身份键作为单级目录名：路径分隔符替换为下划线，`.`/`..` 加前缀
fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}

/// 复制结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// 已复制的字节数
    Copied(u64),
    /// 目标已存在，未做任何写入
    AlreadyExists,
}

/// 存储管理器
#[derive(Debug, Clone)]
pub struct StorageManager {
    base_path: PathBuf,
}

impl StorageManager {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// 存储根目录
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 创建存储根目录
    pub async fn ensure_base(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await
    }

    /// 复制文件到新路径，保留权限和访问/修改时间
    ///
    /// 目标以独占创建方式打开，已存在时不会被覆盖。复制失败时删除写了一半的目标。
    pub async fn copy_new(&self, source: &Path, target: &Path) -> std::io::Result<CopyOutcome> {
        let mut reader = File::open(source).await?;
        let writer = match OpenOptions::new().write(true).create_new(true).open(target).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(CopyOutcome::AlreadyExists),
            Err(e) => return Err(e),
        };

        match Self::write_contents(&mut reader, writer, source, target).await {
            Ok(bytes) => Ok(CopyOutcome::Copied(bytes)),
            Err(e) => {
                let _ = tokio::fs::remove_file(target).await;
                Err(e)
            }
        }
    }

    async fn write_contents(reader: &mut File, mut writer: File, source: &Path, target: &Path) -> std::io::Result<u64> {
        let bytes = tokio::io::copy(reader, &mut writer).await?;
        writer.flush().await?;
        drop(writer);

        let metadata = tokio::fs::metadata(source).await?;
        let accessed = FileTime::from_last_access_time(&metadata);
        let modified = FileTime::from_last_modification_time(&metadata);
        tokio::fs::set_permissions(target, metadata.permissions()).await?;
        filetime::set_file_times(target, accessed, modified)?;
        Ok(bytes)
    }
}
