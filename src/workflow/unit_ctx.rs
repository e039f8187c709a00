//! 单元处理上下文
//!
//! 封装"我正在处理哪个考试季、哪个科目的哪个单元"这一信息

use std::fmt::Display;

use crate::services::UnitKey;

/// 单元处理上下文
#[derive(Debug, Clone)]
pub struct UnitCtx {
    /// 考试类型
    pub qualification: String,

    /// 考试季标签
    pub session: String,

    /// 原始科目名称
    pub subject: String,

    /// 单元标签
    pub unit: String,
}

impl UnitCtx {
    /// 创建新的单元上下文
    pub fn new(
        qualification: impl Into<String>,
        session: impl Into<String>,
        subject: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            qualification: qualification.into(),
            session: session.into(),
            subject: subject.into(),
            unit: unit.into(),
        }
    }

    /// 对应的账本键
    pub fn key(&self) -> UnitKey<'_> {
        UnitKey::new(&self.qualification, &self.session, &self.subject, &self.unit)
    }
}

impl Display for UnitCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} / {} / {}]", self.session, self.subject, self.unit)
    }
}
