//! 合并去重处理器 - 编排层
//!
//! ## 职责
//!
//! 把原始目录 `<考试类型>/<考试季>/<科目变体>/*.json` 合并成规范目录
//! `<考试类型>/<考试季>/<规范科目>/*.json`，同一单元代码只保留一份。
//!
//! ## 规则
//!
//! 1. 科目变体按基础科目名分组（去掉年份和结尾下划线）
//! 2. 组内任一成员是数学类科目时，整组并入 `Mathematics`
//! 3. 同一规范科目内按目录列举顺序处理，先出现的单元代码胜出，之后的记为重复
//! 4. 无法解析代码的文件告警跳过，不计入处理数和重复数
//! 5. 单个变体目录读取失败或其中的文件复制失败只告警并计入 `variant_errors`，
//!    同组其他变体照常处理
//!
//! 每个规范科目先写入同级的临时目录，完成后整体替换目标目录。
//! 本模块从不读写进度账本，去重完全由文件树推导。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult, ConfigError};
use crate::services::artifact_writer::DATA_FILE_EXTENSION;
use crate::services::identifier::{base_subject_name, is_math_family, parse_unit_code, MATH_CANONICAL_NAME};

/// 合并统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// 解析出单元代码的数据文件数
    pub files_processed: usize,
    /// 重复的单元代码数
    pub duplicates_found: usize,
    /// 写入规范目录的文件数（去重后的单元代码数）
    pub distinct_emitted: usize,
    /// 无法解析代码而跳过的文件数
    pub unparseable_skipped: usize,
    /// 读取失败的科目变体数
    pub variant_errors: usize,
    /// 写入的规范科目目录数
    pub subjects_written: usize,
}

impl MergeReport {
    fn absorb(&mut self, other: MergeReport) {
        self.files_processed += other.files_processed;
        self.duplicates_found += other.duplicates_found;
        self.distinct_emitted += other.distinct_emitted;
        self.unparseable_skipped += other.unparseable_skipped;
        self.variant_errors += other.variant_errors;
        self.subjects_written += other.subjects_written;
    }
}

/// 一个规范科目及其来源变体（保持列举顺序）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalGroup {
    pub target: String,
    pub members: Vec<String>,
}

/// 把科目变体目录名分组
///
/// 先按基础科目名分组，含数学类成员的组目标改为 `Mathematics`，
/// 目标相同的组再合并。组和成员都保持输入顺序。
pub fn plan_groups(subjects: &[String]) -> Vec<CanonicalGroup> {
    let mut by_base: Vec<(String, Vec<String>)> = Vec::new();
    for subject in subjects {
        let base = base_subject_name(subject);
        match by_base.iter_mut().find(|(b, _)| *b == base) {
            Some((_, members)) => members.push(subject.clone()),
            None => by_base.push((base, vec![subject.clone()])),
        }
    }

    let mut groups: Vec<CanonicalGroup> = Vec::new();
    for (base, members) in by_base {
        let target = if members.iter().any(|m| is_math_family(m)) {
            MATH_CANONICAL_NAME.to_string()
        } else {
            base
        };
        match groups.iter_mut().find(|g| g.target == target) {
            Some(group) => group.members.extend(members),
            None => groups.push(CanonicalGroup { target, members }),
        }
    }
    groups
}

/// 合并去重引擎
pub struct MergeEngine {
    source: PathBuf,
    target: PathBuf,
}

impl MergeEngine {
    /// 创建引擎；源目录与目标目录不能互相包含
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let source = source.into();
        let target = target.into();

        let (abs_source, abs_target) = (absolute(&source), absolute(&target));
        if abs_source.starts_with(&abs_target) || abs_target.starts_with(&abs_source) {
            return Err(ConfigError::OverlappingTrees {
                source_dir: source,
                target_dir: target,
            });
        }

        Ok(Self { source, target })
    }

    /// 合并整棵原始目录树
    pub async fn run(&self) -> AppResult<MergeReport> {
        info!(
            "🔀 开始合并: {} → {}",
            self.source.display(),
            self.target.display()
        );

        let mut report = MergeReport::default();
        let qualifications = list_dirs(&self.source).await?;

        for qualification in &qualifications {
            let qualification_dir = self.source.join(qualification);
            let sessions = match list_dirs(&qualification_dir).await {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!("⚠️ 跳过考试类型 {}: {}", qualification, e);
                    continue;
                }
            };

            for session in &sessions {
                match self.merge_session(qualification, session).await {
                    Ok(session_report) => report.absorb(session_report),
                    Err(e) => warn!("⚠️ 跳过考试季 {} / {}: {}", qualification, session, e),
                }
            }
        }

        log_merge_report(&report);
        Ok(report)
    }

    /// 合并一个 (考试类型, 考试季)
    pub async fn merge_session(&self, qualification: &str, session: &str) -> AppResult<MergeReport> {
        let source_dir = self.source.join(qualification).join(session);
        let target_dir = self.target.join(qualification).join(session);

        let subjects = list_dirs(&source_dir).await?;
        let groups = plan_groups(&subjects);

        let mut report = MergeReport::default();
        for group in &groups {
            if group.target.is_empty() {
                warn!(
                    "[{} / {}] ⚠️ 科目名为空，跳过: {:?}",
                    qualification, session, group.members
                );
                continue;
            }

            match self.merge_group(&source_dir, &target_dir, group).await {
                Ok(group_report) => {
                    info!(
                        "[{} / {}] {} ← {} 个变体: {} 个单元, {} 个重复",
                        qualification,
                        session,
                        group.target,
                        group.members.len(),
                        group_report.distinct_emitted,
                        group_report.duplicates_found
                    );
                    report.absorb(group_report);
                }
                Err(e) => {
                    error!(
                        "[{} / {}] ❌ 合并科目 {} 失败: {}",
                        qualification, session, group.target, e
                    );
                }
            }
        }
        Ok(report)
    }

    /// 合并一个规范科目：写入临时目录，成功后替换目标目录
    async fn merge_group(
        &self,
        source_dir: &Path,
        target_dir: &Path,
        group: &CanonicalGroup,
    ) -> AppResult<MergeReport> {
        let final_dir = target_dir.join(&group.target);
        let staging_dir = target_dir.join(format!(".{}.staging", group.target));

        if tokio::fs::metadata(&staging_dir).await.is_ok() {
            tokio::fs::remove_dir_all(&staging_dir)
                .await
                .map_err(|e| AppError::write_failed(&staging_dir, e))?;
        }
        tokio::fs::create_dir_all(&staging_dir)
            .await
            .map_err(|e| AppError::write_failed(&staging_dir, e))?;

        let result = copy_distinct(source_dir, &staging_dir, group).await;
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&staging_dir).await;
                return Err(e);
            }
        };

        if report.distinct_emitted == 0 {
            tokio::fs::remove_dir_all(&staging_dir)
                .await
                .map_err(|e| AppError::write_failed(&staging_dir, e))?;
            // 原始目录已没有可用数据，上次合并的结果一并移除
            if tokio::fs::metadata(&final_dir).await.is_ok() {
                tokio::fs::remove_dir_all(&final_dir)
                    .await
                    .map_err(|e| AppError::write_failed(&final_dir, e))?;
                info!("🗑️ 已移除过期的规范科目: {}", final_dir.display());
            }
            return Ok(report);
        }

        if tokio::fs::metadata(&final_dir).await.is_ok() {
            tokio::fs::remove_dir_all(&final_dir)
                .await
                .map_err(|e| AppError::write_failed(&final_dir, e))?;
        }
        tokio::fs::rename(&staging_dir, &final_dir)
            .await
            .map_err(|e| AppError::rename_failed(&staging_dir, &final_dir, e))?;

        Ok(MergeReport {
            subjects_written: 1,
            ..report
        })
    }
}

/// 按列举顺序复制每个单元代码的第一个文件
///
/// 复制失败的文件不计入处理数，其单元代码仍可由之后的变体提供。
async fn copy_distinct(
    source_dir: &Path,
    staging_dir: &Path,
    group: &CanonicalGroup,
) -> AppResult<MergeReport> {
    let mut report = MergeReport::default();
    let mut emitted: HashSet<String> = HashSet::new();

    for member in &group.members {
        let mut member_failed = false;
        let member_dir = source_dir.join(member);
        let files = match list_files(&member_dir).await {
            Ok(files) => files,
            Err(e) => {
                warn!("⚠️ 跳过科目变体 {}: {}", member, e);
                report.variant_errors += 1;
                continue;
            }
        };

        for file_name in files {
            if Path::new(&file_name).extension().and_then(|e| e.to_str()) != Some(DATA_FILE_EXTENSION) {
                continue;
            }

            let Some(code) = parse_unit_code(&file_name) else {
                warn!("⚠️ 无法解析单元代码，跳过: {}/{}", member, file_name);
                report.unparseable_skipped += 1;
                continue;
            };

            if emitted.contains(code) {
                report.files_processed += 1;
                report.duplicates_found += 1;
                continue;
            }

            let from = member_dir.join(&file_name);
            let to = staging_dir.join(&file_name);
            if let Err(e) = tokio::fs::copy(&from, &to).await {
                warn!("⚠️ 复制失败，跳过: {}/{}: {}", member, file_name, e);
                member_failed = true;
                continue;
            }
            report.files_processed += 1;
            emitted.insert(code.to_string());
        }

        if member_failed {
            report.variant_errors += 1;
        }
    }

    report.distinct_emitted = emitted.len();
    Ok(report)
}

/// 列出子目录名（列举顺序，忽略隐藏目录）
async fn list_dirs(dir: &Path) -> AppResult<Vec<String>> {
    list_entries(dir, true).await
}

/// 列出文件名（列举顺序，忽略隐藏文件）
async fn list_files(dir: &Path) -> AppResult<Vec<String>> {
    list_entries(dir, false).await
}

async fn list_entries(dir: &Path, want_dirs: bool) -> AppResult<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| AppError::list_failed(dir, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::list_failed(dir, e))?
    {
        // 跟随符号链接；无法获取元数据的条目（如目标已消失）两种列举都保留，
        // 由调用方在读取或复制时报告并跳过
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_dir() != want_dirs => continue,
            Ok(_) => {}
            Err(e) => debug!("无法获取元数据 {}: {}", entry.path().display(), e),
        }
        match entry.file_name().into_string() {
            Ok(name) if name.starts_with('.') => {}
            Ok(name) => names.push(name),
            Err(raw) => warn!("⚠️ 忽略非 UTF-8 名称: {:?}", raw),
        }
    }
    Ok(names)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn log_merge_report(report: &MergeReport) {
    info!("\n{}", "─".repeat(60));
    info!("🔀 合并完成");
    info!("📄 处理文件: {}", report.files_processed);
    info!("♻️ 重复文件: {}", report.duplicates_found);
    info!("✅ 写入文件: {}", report.distinct_emitted);
    info!("📚 规范科目: {}", report.subjects_written);
    if report.unparseable_skipped > 0 || report.variant_errors > 0 {
        warn!(
            "⚠️ 无法解析: {}, 读取失败的变体: {}",
            report.unparseable_skipped, report.variant_errors
        );
    }
    info!("{}", "─".repeat(60));
}
