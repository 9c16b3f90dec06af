//! # PACS目录模块
//!
//! 将元数据记录归并为患者/检查/序列三级目录，检测归属冲突，并生成汇总报告。

pub mod catalog;
pub mod models;
pub mod report;

pub use catalog::Catalog;
pub use models::*;
pub use report::{ReportFormat, SummaryReport, ThicknessBucket};
