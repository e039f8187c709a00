use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// 浏览器接入方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserMode {
    /// 连接已开启调试端口的浏览器
    Connect,
    /// 自行启动无头浏览器
    Headless,
}

impl BrowserMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "connect" => Some(BrowserMode::Connect),
            "headless" => Some(BrowserMode::Headless),
            _ => None,
        }
    }
}

/// 各层级下拉框与成绩表的 CSS 选择器
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub qualification: String,
    pub session: String,
    pub subject: String,
    pub unit: String,
    /// 成绩视图切换按钮（按文字匹配）
    pub score_view: String,
    /// 成绩表的行
    pub table_rows: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            qualification: "select#qualification".to_string(),
            session: "select#series".to_string(),
            subject: "select#subject".to_string(),
            unit: "select#unit".to_string(),
            score_view: "button, a, label".to_string(),
            table_rows: "table tbody tr".to_string(),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器接入方式
    pub browser_mode: BrowserMode,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 无头模式下的浏览器可执行文件
    pub chrome_executable: Option<PathBuf>,
    /// 目标URL
    pub target_url: String,
    /// 考试类型（顶层范围）
    pub qualification_type: String,
    /// 原始产物目录
    pub raw_output_dir: PathBuf,
    /// 合并后的规范目录
    pub merged_output_dir: PathBuf,
    /// 进度账本文件
    pub progress_file: PathBuf,
    /// 输出日志文件
    pub output_log_file: PathBuf,
    /// 科目过滤（子串匹配，不区分大小写），为空表示全部
    pub subject_filters: Vec<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 每次选择后的等待时间（毫秒）
    pub settle_delay_ms: u64,
    /// "全部分数"视图的标签
    pub score_view_label: String,
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_mode: BrowserMode::Connect,
            browser_debug_port: 9222,
            chrome_executable: None,
            target_url: "https://qualifications.pearson.com/en/support/support-topics/results-certification/ums-converter.html".to_string(),
            qualification_type: "International A Level".to_string(),
            raw_output_dir: PathBuf::from("output/raw"),
            merged_output_dir: PathBuf::from("output/merged"),
            progress_file: PathBuf::from("output/progress.json"),
            output_log_file: PathBuf::from("output/harvest.log"),
            subject_filters: Vec::new(),
            verbose_logging: false,
            settle_delay_ms: 800,
            score_view_label: "All".to_string(),
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("HARVEST_CONFIG").ok().map(PathBuf::from));

        let config = match path {
            Some(path) => Self::from_file(&path).await?,
            None => Self::default(),
        };

        Ok(config.with_env_overrides())
    }

    /// 从 TOML 文件读取配置，缺省字段取默认值
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::FileUnreadable {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_toml_str(&content).map_err(|source| ConfigError::FileInvalid {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖已有配置；无法解析的值保留原值
    pub fn with_env_overrides(self) -> Self {
        let env = |key: &str| std::env::var(key).ok();
        let path = |key: &str| env(key).map(PathBuf::from);

        Self {
            browser_mode: env("HARVEST_BROWSER_MODE")
                .and_then(|v| BrowserMode::parse(&v))
                .unwrap_or(self.browser_mode),
            browser_debug_port: env("BROWSER_DEBUG_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.browser_debug_port),
            chrome_executable: path("HARVEST_CHROME_EXECUTABLE").or(self.chrome_executable),
            target_url: env("HARVEST_TARGET_URL").unwrap_or(self.target_url),
            qualification_type: env("HARVEST_QUALIFICATION").unwrap_or(self.qualification_type),
            raw_output_dir: path("HARVEST_RAW_DIR").unwrap_or(self.raw_output_dir),
            merged_output_dir: path("HARVEST_MERGED_DIR").unwrap_or(self.merged_output_dir),
            progress_file: path("HARVEST_PROGRESS_FILE").unwrap_or(self.progress_file),
            output_log_file: path("HARVEST_LOG_FILE").unwrap_or(self.output_log_file),
            subject_filters: env("HARVEST_SUBJECTS")
                .map(|v| parse_filter_list(&v))
                .unwrap_or(self.subject_filters),
            verbose_logging: env("VERBOSE_LOGGING")
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.verbose_logging),
            settle_delay_ms: env("HARVEST_SETTLE_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.settle_delay_ms),
            score_view_label: env("HARVEST_SCORE_VIEW_LABEL").unwrap_or(self.score_view_label),
            selectors: self.selectors,
        }
    }
}

/// 解析逗号分隔的科目过滤列表，去掉空项
pub fn parse_filter_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
