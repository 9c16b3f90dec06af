//! 按身份键重组文件
//!
//! 每条记录独立处理，终态为以下之一：已复制、缺失数据跳过、重复跳过、失败。
//! 同一目标路径先到先得，后续记录只记日志，从不覆盖。

use crate::event_log::EventLog;
use crate::storage::{CopyOutcome, DirectoryLayout, StorageManager};
use pacs_core::{ArtifactReader, ArtifactRow, Result, ORGANIZE_REQUIRED_COLUMNS};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 重组配置
#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    /// 重组后的根目录
    pub output_dir: PathBuf,
    /// 事件日志文件
    pub log_file: PathBuf,
    /// 目录布局
    pub layout: DirectoryLayout,
}

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// 已复制到目标路径
    Copied { source: String, target: PathBuf, bytes: u64 },
    /// 身份键缺失或源文件不存在
    SkippedMissingData { source: String },
    /// 目标路径已存在
    SkippedDuplicate { source: String, target: PathBuf },
    /// 处理失败
    Failed { source: String, error: String },
}

impl RecordOutcome {
    /// 事件日志中的对应行，复制成功不写日志
    pub fn log_line(&self) -> Option<String> {
        match self {
            RecordOutcome::Copied { .. } => None,
            RecordOutcome::SkippedMissingData { source } => {
                Some(format!("Skipping file with missing data or invalid path: {}", source))
            }
            RecordOutcome::SkippedDuplicate { source, target } => {
                Some(format!("Duplicate file skipped: {} -> {}", source, target.display()))
            }
            RecordOutcome::Failed { source, error } => {
                Some(format!("Error processing file {}: {}", source, error))
            }
        }
    }
}

/// 一次重组运行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeSummary {
    pub total: usize,
    pub copied: usize,
    pub skipped_missing: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl OrganizeSummary {
    fn record(&mut self, outcome: &RecordOutcome) {
        self.total += 1;
        match outcome {
            RecordOutcome::Copied { .. } => self.copied += 1,
            RecordOutcome::SkippedMissingData { .. } => self.skipped_missing += 1,
            RecordOutcome::SkippedDuplicate { .. } => self.duplicates += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl fmt::Display for OrganizeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "共 {} 条记录: 复制 {}, 缺失数据跳过 {}, 重复跳过 {}, 失败 {}",
            self.total, self.copied, self.skipped_missing, self.duplicates, self.failed
        )
    }
}

/// 文件重组器
pub struct FileOrganizer {
    config: OrganizerConfig,
    storage: StorageManager,
}

impl FileOrganizer {
    pub fn new(config: OrganizerConfig) -> Self {
        let storage = StorageManager::new(&config.output_dir);
        Self { config, storage }
    }

    /// 读取表格产物并重组所有记录
    ///
    /// 必需列缺失属于配置错误，在任何复制和日志写入之前返回。
    pub async fn organize(&self, metadata_file: &Path) -> Result<OrganizeSummary> {
        let mut reader = ArtifactReader::open(metadata_file)?;
        reader.require_columns(&ORGANIZE_REQUIRED_COLUMNS)?;

        self.storage.ensure_base().await?;
        let mut log = EventLog::create(&self.config.log_file).await?;
        let mut summary = OrganizeSummary::default();

        info!(
            "开始重组 {} -> {} ({:?})",
            metadata_file.display(),
            self.storage.base_path().display(),
            self.config.layout
        );

        for row in reader.rows() {
            let outcome = match row {
                Ok(row) => self.process_row(&row).await,
                Err(e) => RecordOutcome::Failed {
                    source: "<无法读取的行>".to_string(),
                    error: e.to_string(),
                },
            };

            match &outcome {
                RecordOutcome::Copied { source, target, .. } => {
                    info!("Copied: {} -> {}", source, target.display());
                }
                RecordOutcome::Failed { source, error } => {
                    warn!("Error processing file {}: {}", source, error);
                }
                _ => {}
            }
            if let Some(line) = outcome.log_line() {
                log.write_line(&line).await?;
            }
            summary.record(&outcome);
        }

        let lines = log.finish().await?;
        info!("文件重组完成: {}。日志 {} 行已保存到 {}", summary, lines, self.config.log_file.display());
        Ok(summary)
    }

    /// 处理单条记录
    pub async fn process_row(&self, row: &ArtifactRow) -> RecordOutcome {
        let source = row.display_path();

        let (patient_id, study_uid) = match (row.patient_id.as_deref(), row.study_instance_uid.as_deref()) {
            (Some(patient), Some(study)) => (patient, study),
            _ => return RecordOutcome::SkippedMissingData { source },
        };
        let series_uid = row.series_instance_uid.as_deref();
        if self.config.layout.requires_series() && series_uid.is_none() {
            return RecordOutcome::SkippedMissingData { source };
        }

        let source_path = match &row.file_path {
            Some(path) => PathBuf::from(path),
            None => return RecordOutcome::SkippedMissingData { source },
        };
        if !tokio::fs::try_exists(&source_path).await.unwrap_or(false) {
            return RecordOutcome::SkippedMissingData { source };
        }

        let file_name = match source_path.file_name() {
            Some(name) => name.to_owned(),
            None => {
                return RecordOutcome::Failed {
                    source,
                    error: "source path has no file name".to_string(),
                }
            }
        };

        let target_dir = self
            .config
            .layout
            .target_dir(self.storage.base_path(), patient_id, study_uid, series_uid);
        if let Err(e) = tokio::fs::create_dir_all(&target_dir).await {
            return RecordOutcome::Failed { source, error: e.to_string() };
        }

        let target = target_dir.join(file_name);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return RecordOutcome::SkippedDuplicate { source, target };
        }

        debug!("复制 {} -> {}", source, target.display());
        match self.storage.copy_new(&source_path, &target).await {
            Ok(CopyOutcome::Copied(bytes)) => RecordOutcome::Copied { source, target, bytes },
            Ok(CopyOutcome::AlreadyExists) => RecordOutcome::SkippedDuplicate { source, target },
            Err(e) => RecordOutcome::Failed { source, error: e.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacs_core::PacsError;
    use std::fs;

    const HEADER: &str = "PatientID,StudyInstanceUID,SeriesInstanceUID,SliceThickness,PixelSpacing,StudyDate,AcquisitionDate,FilePath,NumberOfSlices\n";

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self { dir: tempfile::tempdir().unwrap() }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn source(&self, rel: &str, content: &str) -> String {
            let path = self.path(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path.to_string_lossy().into_owned()
        }

        fn artifact(&self, rows: &[String]) -> PathBuf {
            let path = self.path("outputs/metadata.csv");
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("{}{}", HEADER, rows.join(""))).unwrap();
            path
        }

        fn organizer(&self, layout: DirectoryLayout) -> FileOrganizer {
            FileOrganizer::new(OrganizerConfig {
                output_dir: self.path("organized"),
                log_file: self.path("outputs/organize_log.txt"),
                layout,
            })
        }

        fn log(&self) -> String {
            fs::read_to_string(self.path("outputs/organize_log.txt")).unwrap()
        }
    }

    fn row(patient: &str, study: &str, series: &str, path: &str) -> String {
        format!("{},{},{},2.5,,20000101,,{},1\n", patient, study, series, path)
    }

    #[tokio::test]
    async fn test_copies_into_series_layout() {
        let fx = Fixture::new();
        let a = fx.source("data/x/1.dcm", "a");
        let b = fx.source("data/x/2.dcm", "b");
        let artifact = fx.artifact(&[row("P1", "1.2", "1.2.3", &a), row("P1", "1.2", "1.2.3", &b)]);

        let summary = fx.organizer(DirectoryLayout::PatientStudySeries).organize(&artifact).await.unwrap();
        assert_eq!(summary.copied, 2);
        assert_eq!(fs::read_to_string(fx.path("organized/P1/1.2/1.2.3/1.dcm")).unwrap(), "a");
        assert_eq!(fs::read_to_string(fx.path("organized/P1/1.2/1.2.3/2.dcm")).unwrap(), "b");
        assert_eq!(fx.log(), "");
        // 源文件保持不变
        assert!(Path::new(&a).exists());
    }

    #[tokio::test]
    async fn test_duplicate_basename_first_writer_wins() {
        let fx = Fixture::new();
        let first = fx.source("data/one/img.dcm", "first");
        let second = fx.source("data/two/img.dcm", "second");
        let artifact = fx.artifact(&[row("P", "S", "R1", &first), row("P", "S", "R2", &second)]);

        let summary = fx.organizer(DirectoryLayout::PatientStudy).organize(&artifact).await.unwrap();
        assert_eq!(summary.copied, 1);
        assert_eq!(summary.duplicates, 1);

        let target = fx.path("organized/P/S/img.dcm");
        assert_eq!(fs::read_to_string(&target).unwrap(), "first");
        assert_eq!(
            fx.log(),
            format!("Duplicate file skipped: {} -> {}\n", second, target.display())
        );
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let fx = Fixture::new();
        let a = fx.source("data/1.dcm", "a");
        let b = fx.source("data/2.dcm", "b");
        let artifact = fx.artifact(&[row("P", "S", "R", &a), row("P", "S", "R", &b)]);
        let organizer = fx.organizer(DirectoryLayout::PatientStudySeries);

        let first = organizer.organize(&artifact).await.unwrap();
        assert_eq!(first.copied, 2);

        let second = organizer.organize(&artifact).await.unwrap();
        assert_eq!(second.copied, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(fx.log().lines().count(), 2);
        assert!(fx.log().lines().all(|l| l.starts_with("Duplicate file skipped: ")));
        assert_eq!(fs::read_dir(fx.path("organized/P/S/R")).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_missing_identity_or_source_is_skipped_without_mutation() {
        let fx = Fixture::new();
        let a = fx.source("data/1.dcm", "a");
        let absent = fx.path("data/absent.dcm").to_string_lossy().into_owned();
        let artifact = fx.artifact(&[
            row("", "S", "R", &a),
            row("P", "S", "", &a),
            row("P", "S", "R", &absent),
            "P,S,R,,,,,,0\n".to_string(),
        ]);

        let summary = fx.organizer(DirectoryLayout::PatientStudySeries).organize(&artifact).await.unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.skipped_missing, 4);
        assert_eq!(summary.copied, 0);
        // 只创建了空的根目录
        assert_eq!(fs::read_dir(fx.path("organized")).unwrap().count(), 0);

        let log = fx.log();
        assert!(log.contains(&format!("Skipping file with missing data or invalid path: {}\n", a)));
        assert!(log.contains(&format!("Skipping file with missing data or invalid path: {}\n", absent)));
        assert_eq!(log.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_study_layout_does_not_need_series() {
        let fx = Fixture::new();
        let a = fx.source("data/1.dcm", "a");
        let artifact = fx.artifact(&[row("P", "S", "", &a)]);

        let summary = fx.organizer(DirectoryLayout::PatientStudy).organize(&artifact).await.unwrap();
        assert_eq!(summary.copied, 1);
        assert!(fx.path("organized/P/S/1.dcm").exists());
    }

    #[tokio::test]
    async fn test_missing_required_column_is_fatal() {
        let fx = Fixture::new();
        let a = fx.source("data/1.dcm", "a");
        let artifact = fx.path("bad.csv");
        fs::write(&artifact, format!("PatientID,StudyInstanceUID,FilePath\nP,S,{}\n", a)).unwrap();

        let result = fx.organizer(DirectoryLayout::PatientStudySeries).organize(&artifact).await;
        match result {
            Err(PacsError::MissingColumns(missing)) => assert_eq!(missing, vec!["SeriesInstanceUID".to_string()]),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!fx.path("organized").exists());
        assert!(!fx.path("outputs/organize_log.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_reported() {
        let fx = Fixture::new();
        let result = fx
            .organizer(DirectoryLayout::PatientStudySeries)
            .organize(&fx.path("outputs/none.csv"))
            .await;
        assert!(matches!(result, Err(PacsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_artifact_copies_nothing() {
        let fx = Fixture::new();
        let artifact = fx.artifact(&[]);

        let summary = fx.organizer(DirectoryLayout::PatientStudySeries).organize(&artifact).await.unwrap();
        assert_eq!(summary, OrganizeSummary::default());
        assert_eq!(fx.log(), "");
    }

    #[tokio::test]
    async fn test_copy_failure_does_not_abort_batch() {
        let fx = Fixture::new();
        // 源路径是目录：存在但无法作为文件复制
        let dir_source = fx.path("data/folder.dcm");
        fs::create_dir_all(&dir_source).unwrap();
        let dir_source = dir_source.to_string_lossy().into_owned();
        let good = fx.source("data/ok.dcm", "ok");
        let artifact = fx.artifact(&[row("P", "S", "R", &dir_source), row("P", "S", "R", &good)]);

        let summary = fx.organizer(DirectoryLayout::PatientStudySeries).organize(&artifact).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.copied, 1);
        assert!(fx.log().starts_with(&format!("Error processing file {}: ", dir_source)));
        assert!(!fx.path("organized/P/S/R/folder.dcm").exists());
        assert!(fx.path("organized/P/S/R/ok.dcm").exists());
    }

    #[test]
    fn test_log_lines() {
        let outcome = RecordOutcome::SkippedDuplicate {
            source: "/d/a.dcm".to_string(),
            target: PathBuf::from("/o/P/S/a.dcm"),
        };
        assert_eq!(outcome.log_line().unwrap(), "Duplicate file skipped: /d/a.dcm -> /o/P/S/a.dcm");

        let copied = RecordOutcome::Copied {
            source: "/d/a.dcm".to_string(),
            target: PathBuf::from("/o/P/S/a.dcm"),
            bytes: 1,
        };
        assert_eq!(copied.log_line(), None);
    }
}
