//! 成绩表行规整
//!
//! 每行取前两个整数列（卷面分、UMS）和第三列等级，无法解析的行直接丢弃，
//! 结果按 UMS 降序排列。

use tracing::debug;

use crate::models::ScoreRow;

/// 把驱动提取到的原始单元格转换为成绩行
pub fn normalize_rows(rows: &[Vec<String>]) -> Vec<ScoreRow> {
    let mut records: Vec<ScoreRow> = rows.iter().filter_map(|cells| parse_row(cells)).collect();

    let dropped = rows.len() - records.len();
    if dropped > 0 {
        debug!("丢弃 {} 行无法解析的数据", dropped);
    }

    // 稳定排序，同分保持页面顺序
    records.sort_by(|a, b| b.ums.cmp(&a.ums));
    records
}

fn parse_row(cells: &[String]) -> Option<ScoreRow> {
    let [raw, ums, grade, ..] = cells else {
        return None;
    };
    let grade = grade.trim();
    if grade.is_empty() {
        return None;
    }
    Some(ScoreRow {
        raw: parse_int(raw)?,
        ums: parse_int(ums)?,
        grade: grade.to_string(),
    })
}

fn parse_int(cell: &str) -> Option<i64> {
    cell.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_sorted_by_ums_descending() {
        let rows = vec![
            row(&["40", "60", "C"]),
            row(&["72", "120", "A*"]),
            row(&["55", "80", "B"]),
        ];
        let records = normalize_rows(&rows);
        let ums: Vec<i64> = records.iter().map(|r| r.ums).collect();
        assert_eq!(ums, vec![120, 80, 60]);
        assert_eq!(records[0].grade, "A*");
    }

    #[test]
    fn test_unparseable_rows_dropped() {
        let rows = vec![
            row(&["Raw", "UMS", "Grade"]),
            row(&[" 10 ", " 20 ", " U "]),
            row(&["11", "21"]),
            row(&["12", "x", "U"]),
            row(&["13", "23", "  "]),
        ];
        let records = normalize_rows(&rows);
        assert_eq!(
            records,
            vec![ScoreRow {
                raw: 10,
                ums: 20,
                grade: "U".to_string()
            }]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_rows(&[]).is_empty());
    }
}
