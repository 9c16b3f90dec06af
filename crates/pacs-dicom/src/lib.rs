//! # DICOM元数据提取模块
//!
//! 扫描目录树，解析DICOM文件头，并按序列聚合切片数。

pub mod extractor;
pub mod parser;
pub mod scanner;
pub mod validator;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use extractor::{ExtractionDiagnostic, ExtractionReport, MetadataExtractor};
pub use parser::{DicomParser, HeaderFields};
pub use scanner::{FileScanner, ScanResult, ScannedFile};
pub use validator::{HeaderValidator, ValidationResult};
