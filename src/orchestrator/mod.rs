//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责遍历调度和统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `harvest_processor` - 抓取编排器
//! - 管理应用生命周期（接入浏览器、运行、汇总）
//! - 发现并校验考试季，跳过账本中已完成的考试季
//! - 持有驱动（`PageDriver`），串行遍历
//!
//! ### `session_processor` - 单个考试季处理器
//! - 选择考试季、过滤科目
//! - 遍历科目和单元，委托给 `UnitFlow`
//! - 判定并标记考试季完成
//!
//! ### `merge_processor` - 合并去重处理器
//! - 把原始目录树合并为规范目录树
//! - 不接触进度账本
//!
//! ## 层次关系
//!
//! ```text
//! harvest_processor (处理 Vec<考试季>)
//!     ↓
//! session_processor (处理 科目 × 单元)
//!     ↓
//! workflow::UnitFlow (处理单个单元)
//!     ↓
//! services (能力层：ledger / normalize / artifact_writer)
//!     ↓
//! infrastructure (基础设施：PageDriver / JsExecutor)
//! ```

pub mod harvest_processor;
pub mod merge_processor;
pub mod session_processor;

// 重新导出主要类型
pub use harvest_processor::{App, HarvestReport, Harvester};
pub use merge_processor::{MergeEngine, MergeReport};
pub use session_processor::{process_session, RunTotals, SessionStats};
