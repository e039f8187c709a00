//! 单个考试季处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责处理一个考试季下的所有科目和单元，是考试季级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **选择考试季**：驱动定位到该考试季
//! 2. **科目过滤**：按配置的关键词（子串，不区分大小写）筛选科目
//! 3. **遍历单元**：逐个科目、逐个单元委托给 `UnitFlow`
//! 4. **失败隔离**：单个科目出错只记录日志，继续下一个科目
//! 5. **完成判定**：所有发现的单元都已成功或失败时，标记考试季完成

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::infrastructure::PageDriver;
use crate::models::Level;
use crate::services::{Ledger, SessionTally};
use crate::workflow::{UnitCtx, UnitFlow, UnitOutcome};

/// 本次运行中累计发现的总数
///
/// 只增不减，每次发现新科目/单元后同步到账本
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub sessions: u64,
    pub subjects: u64,
    pub units: u64,
}

impl RunTotals {
    pub fn sync_to(&self, ledger: &mut Ledger) {
        ledger.update_stats(self.sessions, self.subjects, self.units);
    }
}

/// 单个考试季的处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// 本考试季处理的科目数
    pub subjects: usize,
    /// 出错跳过的科目数
    pub subject_errors: usize,
    /// 发现的单元数
    pub discovered: usize,
    /// 已成功或失败的单元数
    pub accounted: usize,
    /// 本次新完成的单元数
    pub completed: usize,
    /// 本次新失败的单元数
    pub failed: usize,
    /// 账本中已有记录而跳过的单元数
    pub skipped: usize,
    /// 是否已标记考试季完成
    pub session_completed: bool,
}

/// 本次运行的固定参数
pub struct SessionParams<'a> {
    pub qualification: &'a str,
    pub subject_filters: &'a [String],
}

/// 处理单个考试季
///
/// # 返回
/// 选择考试季或列出科目失败时返回错误，由上层记录后继续下一个考试季
pub async fn process_session<D: PageDriver>(
    driver: &D,
    flow: &UnitFlow,
    ledger: &mut Ledger,
    params: &SessionParams<'_>,
    session: &str,
    totals: &mut RunTotals,
) -> Result<SessionStats> {
    driver
        .select(Level::Session, session)
        .await
        .with_context(|| format!("无法选择考试季: {}", session))?;

    let all_subjects = driver
        .list_options(Level::Subject)
        .await
        .with_context(|| format!("无法列出考试季 {} 的科目", session))?;

    let subjects: Vec<String> = all_subjects
        .iter()
        .filter(|s| subject_allowed(s, params.subject_filters))
        .cloned()
        .collect();

    log_session_subjects(session, all_subjects.len(), subjects.len());

    let mut stats = SessionStats::default();

    // ========== 遍历所有科目 ==========
    for (index, subject) in subjects.iter().enumerate() {
        log_subject_start(session, subject, index + 1, subjects.len());
        stats.subjects += 1;

        match process_subject(driver, flow, ledger, params, session, subject, totals).await {
            Ok(subject_stats) => {
                stats.discovered += subject_stats.discovered;
                stats.accounted += subject_stats.accounted;
                stats.completed += subject_stats.completed;
                stats.failed += subject_stats.failed;
                stats.skipped += subject_stats.skipped;
            }
            Err(e) => {
                error!("[{} / {}] ❌ 科目处理失败: {:#}", session, subject, e);
                stats.subject_errors += 1;
            }
        }
    }

    // 过滤模式下只看到了部分科目，不能认定整个考试季完成
    let filtered = subjects.len() != all_subjects.len();

    if stats.discovered > 0
        && stats.discovered == stats.accounted
        && stats.subject_errors == 0
        && !filtered
    {
        ledger.mark_session_completed(params.qualification, session);
        ledger.record_session_totals(
            params.qualification,
            session,
            SessionTally {
                subjects: stats.subjects,
                units: stats.discovered,
            },
        );
        stats.session_completed = true;
        info!("[{}] ✅ 考试季全部单元已处理，标记完成", session);
    } else if filtered {
        info!("[{}] 已启用科目过滤，不标记考试季完成", session);
    } else {
        warn!(
            "[{}] ⚠️ 考试季未完成: 已处理 {}/{} 个单元，{} 个科目出错",
            session, stats.accounted, stats.discovered, stats.subject_errors
        );
    }

    log_session_complete(session, &stats);
    Ok(stats)
}

/// 处理单个科目下的全部单元
async fn process_subject<D: PageDriver>(
    driver: &D,
    flow: &UnitFlow,
    ledger: &mut Ledger,
    params: &SessionParams<'_>,
    session: &str,
    subject: &str,
    totals: &mut RunTotals,
) -> Result<SessionStats> {
    driver
        .select(Level::Subject, subject)
        .await
        .with_context(|| format!("无法选择科目: {}", subject))?;

    let units = driver
        .list_options(Level::Unit)
        .await
        .with_context(|| format!("无法列出科目 {} 的单元", subject))?;

    info!("[{} / {}] 发现 {} 个单元", session, subject, units.len());

    totals.subjects += 1;
    totals.units += units.len() as u64;
    totals.sync_to(ledger);

    let mut stats = SessionStats {
        discovered: units.len(),
        ..Default::default()
    };

    // ========== 遍历所有单元 ==========
    for unit in &units {
        let ctx = UnitCtx::new(params.qualification, session, subject, unit.as_str());
        match flow.run(driver, &ctx, ledger).await {
            UnitOutcome::Skipped => stats.skipped += 1,
            UnitOutcome::Completed { .. } => stats.completed += 1,
            UnitOutcome::Failed { .. } => stats.failed += 1,
        }
    }

    // 以账本为准重新核对
    stats.accounted = units
        .iter()
        .filter(|unit| {
            let ctx = UnitCtx::new(params.qualification, session, subject, unit.as_str());
            ledger.is_accounted(&ctx.key())
        })
        .count();

    Ok(stats)
}

/// 科目是否通过过滤：未配置过滤时全部通过，否则任一关键词为子串即可（不区分大小写）
pub fn subject_allowed(subject: &str, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }
    let subject = subject.to_lowercase();
    filters
        .iter()
        .any(|f| subject.contains(&f.to_lowercase()))
}

// ========== 日志辅助函数 ==========

fn log_session_subjects(session: &str, total: usize, retained: usize) {
    info!(
        "[{}] 科目总数: {}，本次处理: {}",
        session, total, retained
    );
}

fn log_subject_start(session: &str, subject: &str, index: usize, total: usize) {
    info!("\n[{}] {}", session, "─".repeat(30));
    info!("[{}] 处理第 {}/{} 个科目: {}", session, index, total, subject);
}

fn log_session_complete(session: &str, stats: &SessionStats) {
    info!(
        "[{}] 单元统计: 新成功 {}, 新失败 {}, 跳过 {}, 已处理 {}/{}",
        session, stats.completed, stats.failed, stats.skipped, stats.accounted, stats.discovered
    );
}
