//! DICOM 元数据流水线主程序

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crate::config::PipelineConfig;
use pacs_catalog::ReportFormat;
use pacs_storage::DirectoryLayout;
use std::path::PathBuf;
use tracing::{error, info};

/// 流水线命令行参数
#[derive(Parser, Debug)]
#[command(name = "pacs-pipeline")]
#[command(about = "DICOM 元数据提取、按患者/检查/序列重组与汇总报告")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 扫描目录并生成元数据表格
    Extract {
        /// 待扫描的根目录
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// 元数据表格输出路径
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 只处理指定后缀的文件，可重复
        #[arg(short, long = "ext")]
        extensions: Vec<String>,
    },

    /// 按元数据表格重组文件
    Organize {
        /// 元数据表格
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// 重组输出目录
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// 事件日志文件
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// 目录布局: patient_study_series 或 patient_study
        #[arg(long)]
        layout: Option<DirectoryLayout>,
    },

    /// 生成汇总报告
    Report {
        /// 元数据表格
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// 输出格式: text 或 json
        #[arg(short, long)]
        format: Option<ReportFormat>,

        /// 报告输出文件，默认打印到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 列出目录下的文件及大小
    List {
        /// 目录，默认使用配置中的数据目录
        directory: Option<PathBuf>,

        /// 只列出指定后缀的文件，可重复
        #[arg(short, long = "ext")]
        extensions: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(config.logging.level.as_str())
        .init();

    if let Err(e) = run(args.command, config).await {
        error!("执行失败: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(command: Command, mut config: PipelineConfig) -> Result<()> {
    match command {
        Command::Extract {
            data_dir,
            output,
            extensions,
        } => {
            if let Some(data_dir) = data_dir {
                config.extract.data_dir = data_dir;
            }
            if let Some(output) = output {
                config.extract.output_file = output;
            }
            if !extensions.is_empty() {
                config.extract.extensions = extensions;
            }
            config.validate()?;

            info!("提取元数据: {}", config.extract.data_dir.display());
            commands::run_extract(&config.extract).await?;
        }
        Command::Organize {
            metadata,
            output_dir,
            log_file,
            layout,
        } => {
            if let Some(metadata) = metadata {
                config.organize.metadata_file = metadata;
            }
            if let Some(output_dir) = output_dir {
                config.organize.output_dir = output_dir;
            }
            if let Some(log_file) = log_file {
                config.organize.log_file = log_file;
            }
            if let Some(layout) = layout {
                config.organize.layout = layout;
            }
            config.validate()?;

            info!("重组配置:");
            info!("  元数据表格: {}", config.organize.metadata_file.display());
            info!("  输出目录: {}", config.organize.output_dir.display());
            info!("  事件日志: {}", config.organize.log_file.display());
            info!("  目录布局: {:?}", config.organize.layout);
            commands::run_organize(&config.organize).await?;
        }
        Command::Report {
            metadata,
            format,
            output,
        } => {
            if let Some(metadata) = metadata {
                config.report.metadata_file = metadata;
            }
            if let Some(format) = format {
                config.report.format = format;
            }
            if output.is_some() {
                config.report.output_file = output;
            }
            config.validate()?;

            commands::run_report(&config.report).await?;
        }
        Command::List {
            directory,
            extensions,
        } => {
            let directory = directory.unwrap_or_else(|| config.extract.data_dir.clone());
            let extensions = if extensions.is_empty() {
                config.extract.extensions.clone()
            } else {
                extensions
            };
            commands::run_list(&directory, extensions)?;
        }
    }
    Ok(())
}
