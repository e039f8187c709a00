//! 进度账本 - 业务能力层
//!
//! 记录每个 (考试类型, 考试季, 科目, 单元) 的完成/失败状态，以及已完成的考试季。
//! 账本是"这个叶子是否处理过"的唯一依据，抓取过程中只有编排层写入。
//!
//! 读取时任何一层缺失都视为"没有"，写入时自动补齐缺失的层级。
//! 每次 `save()` 都整体写入临时文件后再重命名，中途崩溃不会破坏上一次的状态。

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// 考试类型 → 考试季 → 科目 → 单元列表（保持插入顺序）
type UnitTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>;

/// 考试类型 → 考试季 → 科目 → 单元 → 失败原因
type ReasonTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>>;

/// 定位一个单元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitKey<'a> {
    pub qualification: &'a str,
    pub session: &'a str,
    pub subject: &'a str,
    pub unit: &'a str,
}

impl<'a> UnitKey<'a> {
    pub fn new(qualification: &'a str, session: &'a str, subject: &'a str, unit: &'a str) -> Self {
        Self {
            qualification,
            session,
            subject,
            unit,
        }
    }
}

impl fmt::Display for UnitKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.qualification, self.session, self.subject, self.unit
        )
    }
}

/// 汇总计数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerStats {
    pub total_sessions: u64,
    pub total_subjects: u64,
    pub total_units: u64,
    pub completed_units: u64,
    pub failed_units: u64,
    pub completed_sessions: u64,
}

/// 账本的持久化结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerState {
    completed: UnitTree,
    failed: UnitTree,
    completed_sessions: BTreeMap<String, Vec<String>>,
    last_update: String,
    stats: LedgerStats,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    failure_reasons: ReasonTree,
    /// 考试类型 → 考试季 → 完成时发现的科目数与单元数
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    session_totals: BTreeMap<String, BTreeMap<String, SessionTally>>,
}

/// 一个考试季的科目数与单元数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTally {
    pub subjects: usize,
    pub units: usize,
}

/// 只读的进度汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    pub stats: LedgerStats,
    pub last_update: String,
    /// completed_units / total_units，四舍五入到整数
    pub completion_percent: u64,
}

impl fmt::Display for LedgerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        writeln!(f, "最后更新: {}", self.last_update)?;
        writeln!(
            f,
            "考试季: {}/{} 已完成",
            s.completed_sessions, s.total_sessions
        )?;
        writeln!(f, "科目总数: {}", s.total_subjects)?;
        writeln!(
            f,
            "单元: 成功 {}, 失败 {}, 总计 {}",
            s.completed_units, s.failed_units, s.total_units
        )?;
        write!(f, "完成度: {}%", self.completion_percent)
    }
}

/// 进度账本
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    state: LedgerState,
}

impl Ledger {
    /// 读取账本；文件不存在或内容损坏时初始化空账本并立即写盘
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();

        match Self::read_state(&path) {
            Ok(state) => {
                debug!("已加载进度账本: {}", path.display());
                Ok(Self { path, state })
            }
            Err(reason) => {
                if path.exists() {
                    warn!(
                        "⚠️ 进度账本无法解析，重新初始化 ({}): {}",
                        path.display(),
                        reason
                    );
                } else {
                    info!("未找到进度账本，创建新的: {}", path.display());
                }
                let mut ledger = Self::empty(path);
                ledger.save()?;
                Ok(ledger)
            }
        }
    }

    /// 只读方式打开，不落盘；无法读取时返回空账本
    pub fn open_read_only(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::read_state(&path) {
            Ok(state) => Self { path, state },
            Err(reason) => {
                warn!("⚠️ 无法读取进度账本 ({}): {}", path.display(), reason);
                Self::empty(path)
            }
        }
    }

    /// 创建内存中的空账本
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: LedgerState::default(),
        }
    }

    fn read_state(path: &Path) -> Result<LedgerState, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写盘：先写临时文件，再整体替换
    pub fn save(&mut self) -> AppResult<()> {
        self.state.last_update = chrono::Local::now().to_rfc3339();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AppError::write_failed(parent, e))?;
            }
        }

        let json = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| AppError::write_failed(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| AppError::rename_failed(&tmp, &self.path, e))?;

        debug!("进度账本已保存: {}", self.path.display());
        Ok(())
    }

    // ========== 查询 ==========

    pub fn is_completed(&self, key: &UnitKey<'_>) -> bool {
        tree_contains(&self.state.completed, key)
    }

    pub fn has_failed(&self, key: &UnitKey<'_>) -> bool {
        tree_contains(&self.state.failed, key)
    }

    /// 成功或失败都算已处理
    pub fn is_accounted(&self, key: &UnitKey<'_>) -> bool {
        self.is_completed(key) || self.has_failed(key)
    }

    pub fn is_session_completed(&self, qualification: &str, session: &str) -> bool {
        self.state
            .completed_sessions
            .get(qualification)
            .is_some_and(|sessions| sessions.iter().any(|s| s == session))
    }

    /// 失败原因（旧账本可能没有记录）
    pub fn failure_reason(&self, key: &UnitKey<'_>) -> Option<&str> {
        self.state
            .failure_reasons
            .get(key.qualification)?
            .get(key.session)?
            .get(key.subject)?
            .get(key.unit)
            .map(String::as_str)
    }

    /// 已完成考试季计入总数的科目数与单元数
    ///
    /// 优先使用完成时记下的发现数（包括没有单元的科目）；
    /// 旧账本没有这项记录时，退回到按已登记单元统计。
    pub fn session_totals(&self, qualification: &str, session: &str) -> SessionTally {
        self.state
            .session_totals
            .get(qualification)
            .and_then(|sessions| sessions.get(session))
            .copied()
            .unwrap_or_else(|| self.accounted_in_session(qualification, session))
    }

    /// 统计账本中某个考试季已登记的科目数与单元数（成功 + 失败，去重）
    pub fn accounted_in_session(&self, qualification: &str, session: &str) -> SessionTally {
        let mut units: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for tree in [&self.state.completed, &self.state.failed] {
            let Some(subjects) = tree.get(qualification).and_then(|s| s.get(session)) else {
                continue;
            };
            for (subject, list) in subjects {
                let entry = units.entry(subject.as_str()).or_default();
                for unit in list {
                    if !entry.contains(&unit.as_str()) {
                        entry.push(unit);
                    }
                }
            }
        }

        SessionTally {
            subjects: units.len(),
            units: units.values().map(Vec::len).sum(),
        }
    }

    pub fn stats(&self) -> &LedgerStats {
        &self.state.stats
    }

    pub fn summary(&self) -> LedgerSummary {
        let stats = self.state.stats.clone();
        let completion_percent = if stats.total_units == 0 {
            0
        } else {
            (stats.completed_units as f64 * 100.0 / stats.total_units as f64).round() as u64
        };
        LedgerSummary {
            stats,
            last_update: self.state.last_update.clone(),
            completion_percent,
        }
    }

    // ========== 写入 ==========

    /// 标记成功；已存在时不重复计数。返回是否为首次写入
    pub fn mark_completed(&mut self, key: &UnitKey<'_>) -> bool {
        if !tree_insert(&mut self.state.completed, key) {
            return false;
        }
        self.state.stats.completed_units += 1;

        // 两个集合互斥
        if tree_remove(&mut self.state.failed, key) {
            self.state.stats.failed_units = self.state.stats.failed_units.saturating_sub(1);
            self.remove_reason(key);
        }
        true
    }

    /// 标记失败；已成功的单元不会被改为失败。返回是否为首次写入
    pub fn mark_failed(&mut self, key: &UnitKey<'_>, reason: &str) -> bool {
        if self.is_completed(key) {
            debug!("单元已成功，忽略失败标记: {}", key);
            return false;
        }
        if !tree_insert(&mut self.state.failed, key) {
            return false;
        }
        self.state.stats.failed_units += 1;
        self.state
            .failure_reasons
            .entry(key.qualification.to_string())
            .or_default()
            .entry(key.session.to_string())
            .or_default()
            .entry(key.subject.to_string())
            .or_default()
            .insert(key.unit.to_string(), reason.to_string());
        true
    }

    /// 标记整个考试季完成
    ///
    /// 调用方需先确认该考试季下发现的每个单元都已成功或失败，账本本身不做校验。
    pub fn mark_session_completed(&mut self, qualification: &str, session: &str) -> bool {
        let sessions = self
            .state
            .completed_sessions
            .entry(qualification.to_string())
            .or_default();
        if sessions.iter().any(|s| s == session) {
            return false;
        }
        sessions.push(session.to_string());
        self.state.stats.completed_sessions += 1;
        true
    }

    /// 记下考试季完成时发现的科目数与单元数，供之后跳过该考试季时计入总数
    pub fn record_session_totals(&mut self, qualification: &str, session: &str, tally: SessionTally) {
        self.state
            .session_totals
            .entry(qualification.to_string())
            .or_default()
            .insert(session.to_string(), tally);
    }

    /// 覆盖三个总数计数
    pub fn update_stats(&mut self, total_sessions: u64, total_subjects: u64, total_units: u64) {
        let stats = &mut self.state.stats;
        stats.total_sessions = total_sessions;
        stats.total_subjects = total_subjects;
        stats.total_units = total_units;
    }

    /// 清除失败记录，让下一次运行重新尝试
    ///
    /// `session` / `subject` 为 `None` 时匹配全部。受影响的考试季同时取消完成标记。
    /// 返回清除的单元数。
    pub fn clear_failed(
        &mut self,
        qualification: &str,
        session: Option<&str>,
        subject: Option<&str>,
    ) -> usize {
        let Some(sessions) = self.state.failed.get_mut(qualification) else {
            return 0;
        };

        let mut removed = 0;
        let mut touched_sessions = Vec::new();

        for (session_name, subjects) in sessions.iter_mut() {
            if session.is_some_and(|s| s != session_name) {
                continue;
            }
            let mut session_removed = 0;
            for (subject_name, units) in subjects.iter_mut() {
                if subject.is_some_and(|s| s != subject_name) {
                    continue;
                }
                session_removed += units.len();
                units.clear();

                if let Some(reasons) = self
                    .state
                    .failure_reasons
                    .get_mut(qualification)
                    .and_then(|s| s.get_mut(session_name))
                {
                    reasons.remove(subject_name);
                }
            }
            subjects.retain(|_, units| !units.is_empty());
            if session_removed > 0 {
                touched_sessions.push(session_name.clone());
                removed += session_removed;
            }
        }
        sessions.retain(|_, subjects| !subjects.is_empty());

        self.state.stats.failed_units = self.state.stats.failed_units.saturating_sub(removed as u64);

        if let Some(completed) = self.state.completed_sessions.get_mut(qualification) {
            let before = completed.len();
            completed.retain(|s| !touched_sessions.contains(s));
            let reopened = (before - completed.len()) as u64;
            self.state.stats.completed_sessions =
                self.state.stats.completed_sessions.saturating_sub(reopened);
        }

        removed
    }

    fn remove_reason(&mut self, key: &UnitKey<'_>) {
        if let Some(units) = self
            .state
            .failure_reasons
            .get_mut(key.qualification)
            .and_then(|s| s.get_mut(key.session))
            .and_then(|s| s.get_mut(key.subject))
        {
            units.remove(key.unit);
        }
    }
}

// ========== 嵌套结构的读写辅助 ==========

fn tree_contains(tree: &UnitTree, key: &UnitKey<'_>) -> bool {
    tree.get(key.qualification)
        .and_then(|sessions| sessions.get(key.session))
        .and_then(|subjects| subjects.get(key.subject))
        .is_some_and(|units| units.iter().any(|u| u == key.unit))
}

fn tree_insert(tree: &mut UnitTree, key: &UnitKey<'_>) -> bool {
    let units = tree
        .entry(key.qualification.to_string())
        .or_default()
        .entry(key.session.to_string())
        .or_default()
        .entry(key.subject.to_string())
        .or_default();
    if units.iter().any(|u| u == key.unit) {
        return false;
    }
    units.push(key.unit.to_string());
    true
}

fn tree_remove(tree: &mut UnitTree, key: &UnitKey<'_>) -> bool {
    let Some(units) = tree
        .get_mut(key.qualification)
        .and_then(|sessions| sessions.get_mut(key.session))
        .and_then(|subjects| subjects.get_mut(key.subject))
    else {
        return false;
    };
    let before = units.len();
    units.retain(|u| u != key.unit);
    units.len() != before
}
