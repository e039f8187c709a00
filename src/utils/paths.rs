//! 路径辅助

/// 把页面上的标签转换为安全的目录/文件名片段
///
/// 空白与 `/\:*?"<>|` 替换为 `_`，例如 `Mathematics (2018)` → `Mathematics_(2018)`
pub fn sanitize_segment(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
