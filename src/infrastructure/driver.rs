//! 页面驱动能力 - 基础设施层
//!
//! 编排层只通过这三个能力操作页面，不关心 DOM 结构。
//! 同一个驱动只有一份可导航状态，调用方必须串行使用。

use crate::error::DriverResult;
use crate::models::Level;

/// 页面驱动
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// 列出某一层级当前可选的标签
    async fn list_options(&self, level: Level) -> DriverResult<Vec<String>>;

    /// 选中某一层级的标签；标签不存在时返回 `DriverError::NotFound`。可重复调用
    async fn select(&self, level: Level, label: &str) -> DriverResult<()>;

    /// 提取当前成绩表的原始单元格；页面状态异常时返回 `DriverError::Extraction`
    async fn extract_score_table(&self) -> DriverResult<Vec<Vec<String>>>;
}
