//! # PACS存储模块
//!
//! 按患者/检查/序列层级重组影像文件，并记录跳过、重复与错误事件。

pub mod event_log;
pub mod organizer;
pub mod storage;

pub use event_log::EventLog;
pub use organizer::{FileOrganizer, OrganizeSummary, OrganizerConfig, RecordOutcome};
pub use storage::{CopyOutcome, DirectoryLayout, StorageManager};
