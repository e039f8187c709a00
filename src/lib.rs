//! # Grade Harvest
//!
//! 抓取考试成绩换算表（卷面分 → UMS → 等级），并把多个来源目录合并去重
//!
//! ## 架构设计
//!
//! 本系统沿用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageDriver` - 列出选项 / 选择标签 / 提取成绩表
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `Ledger` - 进度账本（成功 / 失败 / 已完成考试季）
//! - `identifier` - 单元代码与基础科目名解析
//! - `ArtifactWriter` - 写单元产物 JSON
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个单元"的完整处理流程
//! - `UnitCtx` - 上下文封装（考试季 + 科目 + 单元）
//! - `UnitFlow` - 流程编排（跳过检查 → 选择 → 提取 → 写入 → 记账）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/harvest_processor` - 整次运行的遍历，管理资源
//! - `orchestrator/session_processor` - 单个考试季，遍历科目和单元
//! - `orchestrator/merge_processor` - 原始目录树合并去重
//!
//! ## 模块结构

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, DriverError, DriverResult};
pub use infrastructure::{BrowserDriver, JsExecutor, PageDriver};
pub use models::{Artifact, Level, ScoreRow};
pub use orchestrator::{App, HarvestReport, Harvester, MergeEngine, MergeReport};
pub use services::{Ledger, UnitKey};
pub use workflow::{UnitCtx, UnitFlow, UnitOutcome};
