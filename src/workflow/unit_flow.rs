//! 单元处理流程 - 流程层
//!
//! 核心职责：定义"一个单元"的完整处理流程
//!
//! 流程顺序：
//! 1. 查账本，已成功或已失败直接跳过（不调用驱动）
//! 2. 选择单元 → 选择"全部分数"视图 → 提取 → 规整
//! 3. 有数据则写产物并标记成功，否则标记失败
//! 4. 无论成败立即保存账本

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{DriverResult, HarvestError};
use crate::infrastructure::PageDriver;
use crate::models::{Artifact, Level, ScoreRow};
use crate::services::{normalize_rows, ArtifactWriter, Ledger};
use crate::workflow::unit_ctx::UnitCtx;

/// 单元处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// 账本中已有记录，未调用驱动
    Skipped,
    /// 提取并写入成功
    Completed { records: usize, path: PathBuf },
    /// 已记为失败
    Failed { reason: String },
}

/// 单元处理流程
///
/// - 不持有驱动，由编排层传入
/// - 单个单元的失败只会变成账本里的一条失败记录，不会向上传播
pub struct UnitFlow {
    writer: ArtifactWriter,
    score_view_label: String,
}

impl UnitFlow {
    /// 创建新的单元处理流程
    pub fn new(config: &Config) -> Self {
        Self {
            writer: ArtifactWriter::new(&config.raw_output_dir),
            score_view_label: config.score_view_label.clone(),
        }
    }

    pub async fn run<D: PageDriver>(
        &self,
        driver: &D,
        ctx: &UnitCtx,
        ledger: &mut Ledger,
    ) -> UnitOutcome {
        let key = ctx.key();
        if ledger.is_accounted(&key) {
            info!("{} ⏭️ 账本中已有记录，跳过", ctx);
            return UnitOutcome::Skipped;
        }

        let outcome = match self.extract(driver, ctx).await {
            Ok(records) if records.is_empty() => {
                let reason = HarvestError::EmptyResult.to_string();
                warn!("{} ⚠️ 没有提取到数据", ctx);
                ledger.mark_failed(&key, &reason);
                UnitOutcome::Failed { reason }
            }
            Ok(records) => self.persist(ctx, records, ledger).await,
            Err(e) => {
                let reason = e.to_string();
                error!("{} ❌ 提取失败: {}", ctx, reason);
                ledger.mark_failed(&key, &reason);
                UnitOutcome::Failed { reason }
            }
        };

        // 每个单元处理完都落盘，崩溃最多丢失正在处理的那一个
        if let Err(e) = ledger.save() {
            error!("{} ❌ 保存进度账本失败: {}", ctx, e);
        }

        outcome
    }

    /// 选择单元并提取规整后的成绩行，不写任何文件
    pub async fn extract<D: PageDriver>(
        &self,
        driver: &D,
        ctx: &UnitCtx,
    ) -> DriverResult<Vec<ScoreRow>> {
        driver.select(Level::Unit, &ctx.unit).await?;
        driver
            .select(Level::ScoreView, &self.score_view_label)
            .await?;
        let rows = driver.extract_score_table().await?;
        Ok(normalize_rows(&rows))
    }

    /// 写产物并记为成功；写入失败则记为失败
    async fn persist(&self, ctx: &UnitCtx, records: Vec<ScoreRow>, ledger: &mut Ledger) -> UnitOutcome {
        let key = ctx.key();
        let artifact = Artifact::new(&ctx.qualification, &ctx.session, &ctx.subject, &ctx.unit, records);
        let count = artifact.data.len();

        match self.writer.write(&artifact).await {
            Ok(path) => {
                info!("{} ✓ 已保存 {} 行", ctx, count);
                ledger.mark_completed(&key);
                UnitOutcome::Completed {
                    records: count,
                    path,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                error!("{} ❌ 写入产物失败: {}", ctx, reason);
                ledger.mark_failed(&key, &reason);
                UnitOutcome::Failed { reason }
            }
        }
    }
}
