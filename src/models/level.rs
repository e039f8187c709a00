/// 页面层级
///
/// 抓取时自上而下依次选择：考试类型 → 考试季 → 科目 → 单元 → 成绩视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// 考试类型（如 International A Level）
    Qualification,
    /// 考试季（如 June 2019）
    Session,
    /// 科目（原始名称，可能带年份）
    Subject,
    /// 单元（如 WPH01-01）
    Unit,
    /// 成绩视图（"全部分数"）
    ScoreView,
}

impl Level {
    /// 获取层级名称
    pub fn name(self) -> &'static str {
        match self {
            Level::Qualification => "qualification",
            Level::Session => "session",
            Level::Subject => "subject",
            Level::Unit => "unit",
            Level::ScoreView => "score_view",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
