//! # PACS Core
//!
//! 元数据流水线的核心模块，提供数据结构、错误定义、表格产物读写和通用工具。

pub mod artifact;
pub mod error;
pub mod models;
pub mod utils;

pub use artifact::{ArtifactReader, ArtifactRow, COLUMNS, ORGANIZE_REQUIRED_COLUMNS};
pub use error::{PacsError, Result};
pub use models::*;
