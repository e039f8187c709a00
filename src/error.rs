use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::Level;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 页面驱动相关错误
    #[error("页面驱动错误: {0}")]
    Driver(#[from] DriverError),
    /// 文件存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 抓取流程错误
    #[error("抓取错误: {0}")]
    Harvest(#[from] HarvestError),
    /// JSON 编解码错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// 页面驱动错误
///
/// 驱动只暴露三种失败：找不到标签、提取失败、浏览器本身出错
#[derive(Debug, Error)]
pub enum DriverError {
    /// 当前列表中不存在该标签
    #[error("{level} 中找不到选项: {label}")]
    NotFound { level: Level, label: String },
    /// 页面状态异常，无法提取表格
    #[error("提取成绩表失败: {0}")]
    Extraction(String),
    /// 浏览器协议层错误
    #[error("浏览器错误: {source}")]
    Browser {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 写入失败
    #[error("写入失败 ({}): {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 目录列举失败
    #[error("无法列出目录 ({}): {source}", path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 重命名（原子替换）失败
    #[error("重命名失败 ({} -> {}): {source}", from.display(), to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件无法读取
    #[error("无法读取配置文件 ({}): {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件格式错误
    #[error("配置文件解析失败 ({}): {source}", path.display())]
    FileInvalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// 合并的源目录和目标目录重叠
    #[error("源目录 {} 与目标目录 {} 不能互相包含", source_dir.display(), target_dir.display())]
    OverlappingTrees {
        source_dir: PathBuf,
        target_dir: PathBuf,
    },
}

/// 抓取流程错误
#[derive(Debug, Error)]
pub enum HarvestError {
    /// 没有发现任何合法的考试季
    #[error("没有找到任何有效的考试季 (共发现 {discovered} 个候选)")]
    NoValidSessions { discovered: usize },
    /// 提取到的有效行为空
    #[error("no data extracted")]
    EmptyResult,
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Browser {
            source: Box::new(err),
        }
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Driver(err.into())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件写入错误
    pub fn write_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::Storage(StorageError::WriteFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建目录列举错误
    pub fn list_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::Storage(StorageError::ListFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建重命名错误
    pub fn rename_failed(
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        AppError::Storage(StorageError::RenameFailed {
            from: from.as_ref().to_path_buf(),
            to: to.as_ref().to_path_buf(),
            source,
        })
    }
}

impl DriverError {
    /// 创建找不到选项错误
    pub fn not_found(level: Level, label: impl Into<String>) -> Self {
        DriverError::NotFound {
            level,
            label: label.into(),
        }
    }

    /// 包装任意浏览器层错误
    pub fn browser(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        DriverError::Browser {
            source: Box::new(source),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 页面驱动结果类型
pub type DriverResult<T> = Result<T, DriverError>;
