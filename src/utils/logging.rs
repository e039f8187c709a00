/// 日志工具模块
///
/// 初始化 tracing（终端 + 日志文件），并提供统一格式的横幅输出
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::services::LedgerSummary;

/// 初始化日志
///
/// # 参数
/// - `log_file_path`: 日志文件路径，`None` 时只输出到终端
/// - `verbose`: 未设置 `RUST_LOG` 时是否使用 debug 级别
pub fn init(log_file_path: Option<&Path>, verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_file_path {
        Some(path) => {
            let file = init_log_file(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .context("日志系统已初始化")?;

    Ok(())
}

/// 初始化日志文件：清空并写入抬头，返回追加写句柄
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &Path) -> Result<File> {
    if let Some(parent) = log_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建日志目录: {}", parent.display()))?;
        }
    }

    let log_header = format!(
        "{}\n成绩换算表抓取日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path.display()))?;

    let file = OpenOptions::new()
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path.display()))?;
    Ok(file)
}

/// 输出一段带分隔线的标题
pub fn log_banner(title: &str) {
    info!("{}", "=".repeat(60));
    info!("{}", title);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `summary`: 账本汇总
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(summary: &LedgerSummary, log_file_path: &Path) {
    let stats = &summary.stats;
    info!("\n{}", "=".repeat(60));
    info!("📊 抓取完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "📅 考试季: {}/{} 已完成",
        stats.completed_sessions, stats.total_sessions
    );
    info!("📚 科目: {}", stats.total_subjects);
    info!("✅ 成功单元: {}/{}", stats.completed_units, stats.total_units);
    info!("❌ 失败单元: {}", stats.failed_units);
    info!("📈 完成度: {}%", summary.completion_percent);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path.display());
}
