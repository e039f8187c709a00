//! 抓取编排器 - 编排层
//!
//! ## 职责
//!
//! 本模块是抓取流程的入口，负责一次完整运行的遍历和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：接入浏览器、创建 JsExecutor 和驱动
//! 2. **发现考试季**：列出候选并按"月份 + 四位年份"校验，全部无效则整次运行失败
//!    （考试类型只作为路径和账本的键，由驱动在列出考试季前自行定位）
//! 3. **断点续跑**：账本中已完成的考试季直接跳过，连驱动都不选择
//! 4. **顺序遍历**：考试季 → 科目 → 单元，全部串行（驱动只有一份页面状态）
//! 5. **全局统计**：运行结束后保存账本并输出汇总
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有 Browser 的模块
//! - **向下委托**：委托 session_processor 处理单个考试季

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::HarvestError;
use crate::infrastructure::{BrowserDriver, JsExecutor, PageDriver};
use crate::models::{Level, ScoreRow};
use crate::orchestrator::session_processor::{self, RunTotals, SessionParams};
use crate::services::identifier::is_valid_session_label;
use crate::services::Ledger;
use crate::utils::logging;
use crate::workflow::{UnitCtx, UnitFlow};

/// 一次运行的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    /// 有效考试季数量
    pub sessions_total: usize,
    /// 账本中已完成而跳过的考试季
    pub sessions_skipped: usize,
    /// 本次标记完成的考试季
    pub sessions_completed: usize,
    /// 选择或列出科目失败的考试季
    pub session_errors: usize,
    pub subject_errors: usize,
    pub units_completed: usize,
    pub units_failed: usize,
    pub units_skipped: usize,
}

/// 抓取编排器
///
/// 泛型驱动便于在测试中替换为内存实现
pub struct Harvester<D: PageDriver> {
    config: Config,
    driver: D,
    flow: UnitFlow,
}

impl<D: PageDriver> Harvester<D> {
    pub fn new(config: Config, driver: D) -> Self {
        let flow = UnitFlow::new(&config);
        Self {
            config,
            driver,
            flow,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// 完整遍历一次
    pub async fn run(&self, ledger: &mut Ledger) -> Result<HarvestReport> {
        let qualification = self.config.qualification_type.as_str();

        let sessions = self.discover_sessions().await?;
        log_sessions_loaded(qualification, sessions.len());

        let params = SessionParams {
            qualification,
            subject_filters: &self.config.subject_filters,
        };
        if !params.subject_filters.is_empty() {
            info!("🔎 科目过滤: {}", params.subject_filters.join(", "));
        }

        let mut totals = RunTotals {
            sessions: sessions.len() as u64,
            ..Default::default()
        };
        totals.sync_to(ledger);

        let mut report = HarvestReport {
            sessions_total: sessions.len(),
            ..Default::default()
        };

        // ========== 遍历所有考试季 ==========
        for (index, session) in sessions.iter().enumerate() {
            if ledger.is_session_completed(qualification, session) {
                // 已完成的考试季按上次发现的数量计入总数，总数在多次运行间保持不变
                let tally = ledger.session_totals(qualification, session);
                totals.subjects += tally.subjects as u64;
                totals.units += tally.units as u64;
                totals.sync_to(ledger);

                info!("[{}] ⏭️ 考试季已完成，跳过", session);
                report.sessions_skipped += 1;
                continue;
            }

            log_session_start(index + 1, sessions.len(), session);

            match session_processor::process_session(
                &self.driver,
                &self.flow,
                ledger,
                &params,
                session,
                &mut totals,
            )
            .await
            {
                Ok(stats) => {
                    report.subject_errors += stats.subject_errors;
                    report.units_completed += stats.completed;
                    report.units_failed += stats.failed;
                    report.units_skipped += stats.skipped;
                    if stats.session_completed {
                        report.sessions_completed += 1;
                    }
                }
                Err(e) => {
                    error!("[{}] ❌ 考试季处理失败: {:#}", session, e);
                    report.session_errors += 1;
                }
            }

            if let Err(e) = ledger.save() {
                error!("[{}] ❌ 保存进度账本失败: {}", session, e);
            }
        }

        ledger
            .save()
            .with_context(|| format!("无法保存进度账本: {}", ledger.path().display()))?;

        Ok(report)
    }

    /// 单个单元的试跑：只提取并返回数据，不写产物也不写账本
    pub async fn probe_unit(&self, session: &str, subject: &str, unit: &str) -> Result<Vec<ScoreRow>> {
        let qualification = self.config.qualification_type.as_str();
        let ctx = UnitCtx::new(qualification, session, subject, unit);
        info!("{} 🧪 单元试跑", ctx);

        self.driver
            .select(Level::Session, session)
            .await
            .with_context(|| format!("无法选择考试季: {}", session))?;
        self.driver
            .select(Level::Subject, subject)
            .await
            .with_context(|| format!("无法选择科目: {}", subject))?;

        let records = self
            .flow
            .extract(&self.driver, &ctx)
            .await
            .with_context(|| format!("{} 提取失败", ctx))?;

        if records.is_empty() {
            warn!("{} ⚠️ {}", ctx, HarvestError::EmptyResult);
        } else {
            log_probe_records(&ctx, &records);
        }
        Ok(records)
    }

    /// 列出考试季并校验标签
    async fn discover_sessions(&self) -> Result<Vec<String>> {
        let candidates = self
            .driver
            .list_options(Level::Session)
            .await
            .context("无法列出考试季")?;

        let mut sessions = Vec::new();
        for label in &candidates {
            if is_valid_session_label(label) {
                sessions.push(label.clone());
            } else {
                warn!("⚠️ 忽略无效的考试季标签: {:?}", label);
            }
        }

        if sessions.is_empty() {
            return Err(HarvestError::NoValidSessions {
                discovered: candidates.len(),
            }
            .into());
        }
        Ok(sessions)
    }
}

/// 应用主结构（浏览器版本）
pub struct App {
    config: Config,
    _browser: Browser,
    harvester: Harvester<BrowserDriver>,
}

impl App {
    /// 初始化应用：接入浏览器并创建驱动
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let (browser, page) = browser::open_target_page(&config).await?;

        let executor = JsExecutor::new(page);
        let driver = BrowserDriver::new(
            executor,
            config.selectors.clone(),
            config.qualification_type.clone(),
            Duration::from_millis(config.settle_delay_ms),
        );

        Ok(Self {
            harvester: Harvester::new(config.clone(), driver),
            config,
            _browser: browser,
        })
    }

    /// 完整抓取
    pub async fn run(&self) -> Result<HarvestReport> {
        let mut ledger = Ledger::load(&self.config.progress_file)?;
        let report = self.harvester.run(&mut ledger).await?;

        log_report(&report);
        logging::print_final_stats(&ledger.summary(), &self.config.output_log_file);
        Ok(report)
    }

    /// 单元试跑
    pub async fn probe(&self, session: &str, subject: &str, unit: &str) -> Result<Vec<ScoreRow>> {
        self.harvester.probe_unit(session, subject, unit).await
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    logging::log_banner("🚀 程序启动 - 成绩换算表抓取");
    info!("📚 考试类型: {}", config.qualification_type);
    info!("📁 原始输出目录: {}", config.raw_output_dir.display());
    info!("📒 进度账本: {}", config.progress_file.display());
}

fn log_sessions_loaded(qualification: &str, total: usize) {
    info!("✓ {} 共找到 {} 个有效考试季", qualification, total);
}

fn log_session_start(index: usize, total: usize, session: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📅 开始处理第 {}/{} 个考试季: {}", index, total, session);
    info!("{}", "=".repeat(60));
}

fn log_report(report: &HarvestReport) {
    info!("\n{}", "─".repeat(60));
    info!(
        "本次运行: 考试季 {} 个 (跳过 {}, 新完成 {}, 出错 {})",
        report.sessions_total,
        report.sessions_skipped,
        report.sessions_completed,
        report.session_errors
    );
    info!(
        "单元: 新成功 {}, 新失败 {}, 跳过 {}; 科目出错 {}",
        report.units_completed, report.units_failed, report.units_skipped, report.subject_errors
    );
    info!("{}", "─".repeat(60));
}

fn log_probe_records(ctx: &UnitCtx, records: &[ScoreRow]) {
    info!("{} 共 {} 行:", ctx, records.len());
    for row in records {
        info!("  RAW {:>4} | UMS {:>4} | {}", row.raw, row.ums, row.grade);
    }
}
