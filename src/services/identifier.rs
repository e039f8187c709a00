//! 标识解析 - 业务能力层
//!
//! 从文件名中解析单元代码，从科目目录名中解析基础科目名。
//! 全部是纯函数，不接触文件系统。

use regex::Regex;
use std::sync::OnceLock;

/// 数学类科目合并后的规范名称
pub const MATH_CANONICAL_NAME: &str = "Mathematics";

/// 数学类科目（原始目录名，精确匹配）
static MATH_FAMILY: phf::Set<&'static str> = phf::phf_set! {
    "Mathematics_(2018)",
    "Further_Mathematics",
    "Pure_Mathematics_(2015)",
};

fn unit_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{2,3}[0-9]{2}(?:-[0-9]{2})?[A-Z]?").expect("合法的正则"))
}

fn year_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\([0-9]{4}\)\s*").expect("合法的正则"))
}

fn session_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(january|february|march|april|may|june|july|august|september|october|november|december)\s+[0-9]{4}\s*$",
        )
        .expect("合法的正则")
    })
}

/// 解析单元代码
///
/// 匹配名称开头的 `[A-Z]{2,3}\d{2}(-\d{2})?[A-Z]?`，例如
/// `WMA02-01C_Core.json` → `WMA02-01C`。不匹配时返回 `None`，
/// 由调用方决定是否告警跳过。
pub fn parse_unit_code(name: &str) -> Option<&str> {
    unit_code_regex().find(name).map(|m| m.as_str())
}

/// 基础科目名：去掉所有带括号的四位年份（连同两侧空白）以及结尾的下划线
///
/// 反复处理直到不再变化，保证 `base(base(s)) == base(s)`。
pub fn base_subject_name(name: &str) -> String {
    let mut current = name.to_string();
    loop {
        let stripped = year_token_regex().replace_all(&current, "");
        let next = stripped.trim_end_matches('_').to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// 是否为数学类科目（对原始名称精确匹配）
pub fn is_math_family(name: &str) -> bool {
    MATH_FAMILY.contains(name)
}

/// 考试季标签是否形如 "June 2019"
pub fn is_valid_session_label(label: &str) -> bool {
    session_label_regex().is_match(label)
}
