use serde::{Deserialize, Serialize};

/// 一行成绩换算数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// 卷面分
    #[serde(rename = "RAW")]
    pub raw: i64,
    /// 换算后的 UMS 分
    #[serde(rename = "UMS")]
    pub ums: i64,
    /// 等级
    #[serde(rename = "GRADE")]
    pub grade: String,
}

/// 单元产物的元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub qualification_type: String,
    pub session: String,
    pub subject: String,
    pub unit: String,
    pub record_count: usize,
    pub timestamp: String,
}

/// 一个单元的持久化产物
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub metadata: ArtifactMetadata,
    /// 按 UMS 降序排列
    pub data: Vec<ScoreRow>,
}

impl Artifact {
    /// 由已排序的数据行构建产物，时间戳取当前时间
    pub fn new(
        qualification_type: &str,
        session: &str,
        subject: &str,
        unit: &str,
        data: Vec<ScoreRow>,
    ) -> Self {
        Self {
            metadata: ArtifactMetadata {
                qualification_type: qualification_type.to_string(),
                session: session.to_string(),
                subject: subject.to_string(),
                unit: unit.to_string(),
                record_count: data.len(),
                timestamp: chrono::Local::now().to_rfc3339(),
            },
            data,
        }
    }
}
