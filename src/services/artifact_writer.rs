//! 产物写入服务 - 业务能力层
//!
//! 只负责"把一个单元的数据写成 JSON 文件"，不关心流程和账本

use std::path::PathBuf;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::Artifact;
use crate::utils::paths::sanitize_segment;

/// 原始产物的数据文件扩展名
pub const DATA_FILE_EXTENSION: &str = "json";

/// 产物写入服务
///
/// 目录结构：`<root>/<考试类型>/<考试季>/<科目>/<单元>.json`
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    /// 创建写入服务
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 计算某个单元的产物路径
    pub fn artifact_path(&self, qualification: &str, session: &str, subject: &str, unit: &str) -> PathBuf {
        self.root
            .join(sanitize_segment(qualification))
            .join(sanitize_segment(session))
            .join(sanitize_segment(subject))
            .join(format!("{}.{}", sanitize_segment(unit), DATA_FILE_EXTENSION))
    }

    /// 写入产物：先写临时文件再重命名
    ///
    /// # 返回
    /// 返回最终写入的路径
    pub async fn write(&self, artifact: &Artifact) -> AppResult<PathBuf> {
        let meta = &artifact.metadata;
        let path = self.artifact_path(&meta.qualification_type, &meta.session, &meta.subject, &meta.unit);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::write_failed(parent, e))?;
        }

        let json = serde_json::to_string_pretty(artifact)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::write_failed(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::rename_failed(&tmp, &path, e))?;

        debug!("产物已写入: {} ({} 行)", path.display(), meta.record_count);
        Ok(path)
    }
}
