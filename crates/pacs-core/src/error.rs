//! 错误定义模块

use thiserror::Error;

/// PACS系统统一错误类型
#[derive(Error, Debug)]
pub enum PacsError {
    #[error("DICOM解析错误: {0}")]
    DicomParseError(String),

    #[error("表格产物错误: {0}")]
    Artifact(#[from] csv::Error),

    #[error("缺少必需列: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl PacsError {
    /// 是否为配置级错误（需在任何文件操作前中止）
    pub fn is_configuration(&self) -> bool {
        matches!(self, PacsError::MissingColumns(_))
    }
}

/// PACS系统统一结果类型
pub type Result<T> = std::result::Result<T, PacsError>;
