//! 配置管理
//!
//! 加载顺序：默认值 → 配置文件（默认 `pacs.toml`，可选）→ `PACS_` 前缀环境变量 → 命令行参数。
//! 环境变量用双下划线分隔层级，如 `PACS_ORGANIZE__OUTPUT_DIR`。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use pacs_catalog::ReportFormat;
use pacs_storage::DirectoryLayout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::error;

/// 未指定 `--config` 时查找的配置文件
pub const DEFAULT_CONFIG_NAME: &str = "pacs";

/// 流水线完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 元数据提取配置
    pub extract: ExtractConfig,
    /// 文件重组配置
    pub organize: OrganizeConfig,
    /// 汇总报告配置
    pub report: ReportConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 元数据提取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// 待扫描的根目录
    pub data_dir: PathBuf,
    /// 表格产物输出路径
    pub output_file: PathBuf,
    /// 文件后缀过滤，为空时尝试所有文件
    pub extensions: Vec<String>,
}

/// 文件重组配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    /// 输入的表格产物
    pub metadata_file: PathBuf,
    /// 重组输出根目录
    pub output_dir: PathBuf,
    /// 事件日志
    pub log_file: PathBuf,
    /// 目录布局
    pub layout: DirectoryLayout,
}

/// 汇总报告配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub metadata_file: PathBuf,
    pub format: ReportFormat,
    /// 为空时输出到标准输出
    pub output_file: Option<PathBuf>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或 EnvFilter 表达式
    pub level: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/"),
            output_file: PathBuf::from("./outputs/metadata.csv"),
            extensions: Vec::new(),
        }
    }
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            metadata_file: PathBuf::from("./outputs/metadata.csv"),
            output_dir: PathBuf::from("./organized_data/"),
            log_file: PathBuf::from("./outputs/organize_log.txt"),
            layout: DirectoryLayout::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            metadata_file: PathBuf::from("./outputs/metadata.csv"),
            format: ReportFormat::default(),
            output_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// 加载配置
    ///
    /// 显式指定的配置文件必须存在；未指定时 `pacs.toml` 可缺省。
    /// 不做校验，命令行参数覆盖后由调用方调用 [`PipelineConfig::validate`]。
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_with(config_path, environment())
    }

    fn load_with(config_path: Option<&str>, environment: Environment) -> Result<Self> {
        let file = match config_path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()
            .context("Failed to load configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::new().validate(self)
    }
}

/// `PACS_` 前缀环境变量，双下划线分隔层级
fn environment() -> Environment {
    Environment::with_prefix("PACS")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("extract.extensions")
}

/// 验证规则
struct ValidationRule {
    field_path: &'static str,
    validator: fn(&PipelineConfig) -> Result<()>,
}

/// 配置验证器
struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

fn non_empty(path: &std::path::Path, name: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        Err(anyhow::anyhow!("{} cannot be empty", name))
    } else {
        Ok(())
    }
}

impl ConfigValidator {
    fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "extract.data_dir",
                validator: |config| non_empty(&config.extract.data_dir, "data directory"),
            },
            ValidationRule {
                field_path: "extract.output_file",
                validator: |config| non_empty(&config.extract.output_file, "metadata output file"),
            },
            ValidationRule {
                field_path: "extract.extensions",
                validator: |config| {
                    if config.extract.extensions.iter().any(|ext| ext.trim().is_empty()) {
                        Err(anyhow::anyhow!("File extension filter contains an empty entry"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "organize.metadata_file",
                validator: |config| non_empty(&config.organize.metadata_file, "metadata file"),
            },
            ValidationRule {
                field_path: "organize.log_file",
                validator: |config| non_empty(&config.organize.log_file, "organize log file"),
            },
            ValidationRule {
                field_path: "organize.output_dir",
                validator: |config| {
                    non_empty(&config.organize.output_dir, "organize output directory")?;
                    if config.organize.output_dir == config.extract.data_dir {
                        Err(anyhow::anyhow!("Organize output directory must differ from the data directory"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "report.metadata_file",
                validator: |config| non_empty(&config.report.metadata_file, "report metadata file"),
            },
        ];

        Self { validation_rules }
    }

    fn validate(&self, config: &PipelineConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("Invalid configuration {}: {}", rule.field_path, e));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.organize.layout, DirectoryLayout::PatientStudySeries);
        assert_eq!(config.extract.output_file, config.organize.metadata_file);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_output_dir_equal_to_data_dir_is_rejected() {
        let mut config = PipelineConfig::default();
        config.organize.output_dir = config.extract.data_dir.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("organize.output_dir"));
    }

    #[test]
    fn test_empty_extension_is_rejected() {
        let mut config = PipelineConfig::default();
        config.extract.extensions = vec![".dcm".to_string(), " ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            r#"
[extract]
data_dir = "/scans"
extensions = [".dcm"]

[organize]
layout = "patient_study"

[report]
format = "json"
"#,
        )
        .unwrap();

        let config = PipelineConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.extract.data_dir, PathBuf::from("/scans"));
        assert_eq!(config.extract.extensions, vec![".dcm".to_string()]);
        assert_eq!(config.organize.layout, DirectoryLayout::PatientStudy);
        assert_eq!(config.report.format, ReportFormat::Json);
        // 未配置的字段保留默认值
        assert_eq!(config.organize.log_file, PathBuf::from("./outputs/organize_log.txt"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[organize]\noutput_dir = \"/from/file\"\n").unwrap();

        let vars: config::Map<String, String> = [
            ("PACS_ORGANIZE__OUTPUT_DIR", "/tmp/organized"),
            ("PACS_EXTRACT__EXTENSIONS", ".dcm,.ima"),
            ("PACS_REPORT__FORMAT", "json"),
            ("OTHER_EXTRACT__DATA_DIR", "/ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config =
            PipelineConfig::load_with(Some(path.to_str().unwrap()), environment().source(Some(vars))).unwrap();
        assert_eq!(config.organize.output_dir, PathBuf::from("/tmp/organized"));
        assert_eq!(config.extract.extensions, vec![".dcm".to_string(), ".ima".to_string()]);
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.extract.data_dir, PathBuf::from("./data/"));
    }

    #[test]
    fn test_invalid_file_values_can_be_overridden_before_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            "[extract]\ndata_dir = \"/scans\"\n\n[organize]\noutput_dir = \"/scans\"\n",
        )
        .unwrap();

        let mut config = PipelineConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert!(config.validate().is_err());

        // 命令行 -o 覆盖后通过校验
        config.organize.output_dir = PathBuf::from("/organized");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(PipelineConfig::load(Some(path.to_str().unwrap())).is_err());
    }
}
