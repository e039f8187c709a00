#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use grade_harvest::{Config, DriverError, DriverResult, Level, PageDriver};

pub const QUALIFICATION: &str = "International A Level";
pub const SCORE_VIEW: &str = "All";

/// 单元在模拟页面上的表现
#[derive(Debug, Clone)]
pub enum MockUnit {
    Rows(Vec<Vec<String>>),
    /// 提取时报错
    Fail(String),
    /// 出现在列表中，但选择时找不到
    Missing,
}

impl MockUnit {
    /// 三行合法数据，附带一行表头
    pub fn ok() -> Self {
        MockUnit::Rows(vec![
            cells(&["Raw", "UMS", "Grade"]),
            cells(&["40", "60", "C"]),
            cells(&["72", "120", "A*"]),
            cells(&["55", "80", "B"]),
        ])
    }

    pub fn empty() -> Self {
        MockUnit::Rows(vec![cells(&["Raw", "UMS", "Grade"])])
    }
}

pub fn cells(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct MockSubject {
    pub name: String,
    pub units: Vec<(String, MockUnit)>,
    /// 选择科目时报错
    pub broken: bool,
}

#[derive(Debug, Clone)]
pub struct MockSession {
    pub label: String,
    pub subjects: Vec<MockSubject>,
}

pub fn subject(name: &str, units: Vec<(&str, MockUnit)>) -> MockSubject {
    MockSubject {
        name: name.to_string(),
        units: units.into_iter().map(|(u, m)| (u.to_string(), m)).collect(),
        broken: false,
    }
}

pub fn session(label: &str, subjects: Vec<MockSubject>) -> MockSession {
    MockSession {
        label: label.to_string(),
        subjects,
    }
}

#[derive(Debug, Default)]
struct Position {
    session: Option<usize>,
    subject: Option<usize>,
    unit: Option<usize>,
    score_view: bool,
}

/// 内存中的页面驱动，记录每一次调用
pub struct MockDriver {
    sessions: Mutex<Vec<MockSession>>,
    extra_session_labels: Vec<String>,
    position: Mutex<Position>,
    selections: Mutex<Vec<(Level, String)>>,
    extractions: Mutex<Vec<String>>,
}

impl MockDriver {
    pub fn new(sessions: Vec<MockSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions),
            extra_session_labels: vec!["Select a series".to_string()],
            position: Mutex::new(Position::default()),
            selections: Mutex::new(Vec::new()),
            extractions: Mutex::new(Vec::new()),
        }
    }

    /// 只返回无效的考试季标签
    pub fn without_valid_sessions() -> Self {
        let mut driver = Self::new(Vec::new());
        driver.extra_session_labels = vec!["Select a series".to_string(), "2019".to_string()];
        driver
    }

    /// 替换某个单元的表现
    pub fn set_unit(&self, session: &str, subject: &str, unit: &str, behaviour: MockUnit) {
        let mut sessions = self.sessions.lock().unwrap();
        let target = sessions
            .iter_mut()
            .find(|s| s.label == session)
            .and_then(|s| s.subjects.iter_mut().find(|s| s.name == subject))
            .and_then(|s| s.units.iter_mut().find(|(u, _)| u == unit))
            .expect("unit exists");
        target.1 = behaviour;
    }

    pub fn selections(&self) -> Vec<(Level, String)> {
        self.selections.lock().unwrap().clone()
    }

    pub fn extractions(&self) -> Vec<String> {
        self.extractions.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.selections.lock().unwrap().clear();
        self.extractions.lock().unwrap().clear();
    }
}

impl PageDriver for MockDriver {
    async fn list_options(&self, level: Level) -> DriverResult<Vec<String>> {
        let sessions = self.sessions.lock().unwrap();
        let pos = self.position.lock().unwrap();
        match level {
            Level::Session => {
                let mut labels = self.extra_session_labels.clone();
                labels.extend(sessions.iter().map(|s| s.label.clone()));
                Ok(labels)
            }
            Level::Subject => {
                let index = pos
                    .session
                    .ok_or_else(|| DriverError::Extraction("no session selected".into()))?;
                Ok(sessions[index].subjects.iter().map(|s| s.name.clone()).collect())
            }
            Level::Unit => {
                let (si, ji) = pos
                    .session
                    .zip(pos.subject)
                    .ok_or_else(|| DriverError::Extraction("no subject selected".into()))?;
                Ok(sessions[si].subjects[ji]
                    .units
                    .iter()
                    .map(|(u, _)| u.clone())
                    .collect())
            }
            Level::Qualification => Ok(vec![QUALIFICATION.to_string()]),
            Level::ScoreView => Ok(vec![SCORE_VIEW.to_string()]),
        }
    }

    async fn select(&self, level: Level, label: &str) -> DriverResult<()> {
        self.selections
            .lock()
            .unwrap()
            .push((level, label.to_string()));

        let sessions = self.sessions.lock().unwrap();
        let mut pos = self.position.lock().unwrap();
        match level {
            Level::Qualification => {
                if label != QUALIFICATION {
                    return Err(DriverError::not_found(level, label));
                }
            }
            Level::Session => {
                let index = sessions
                    .iter()
                    .position(|s| s.label == label)
                    .ok_or_else(|| DriverError::not_found(level, label))?;
                *pos = Position {
                    session: Some(index),
                    ..Default::default()
                };
            }
            Level::Subject => {
                let si = pos
                    .session
                    .ok_or_else(|| DriverError::not_found(level, label))?;
                let index = sessions[si]
                    .subjects
                    .iter()
                    .position(|s| s.name == label)
                    .ok_or_else(|| DriverError::not_found(level, label))?;
                if sessions[si].subjects[index].broken {
                    return Err(DriverError::Extraction("subject page crashed".into()));
                }
                pos.subject = Some(index);
                pos.unit = None;
                pos.score_view = false;
            }
            Level::Unit => {
                let (si, ji) = pos
                    .session
                    .zip(pos.subject)
                    .ok_or_else(|| DriverError::not_found(level, label))?;
                let index = sessions[si].subjects[ji]
                    .units
                    .iter()
                    .position(|(u, _)| u == label)
                    .ok_or_else(|| DriverError::not_found(level, label))?;
                if matches!(sessions[si].subjects[ji].units[index].1, MockUnit::Missing) {
                    return Err(DriverError::not_found(level, label));
                }
                pos.unit = Some(index);
                pos.score_view = false;
            }
            Level::ScoreView => {
                if label != SCORE_VIEW {
                    return Err(DriverError::not_found(level, label));
                }
                pos.score_view = true;
            }
        }
        Ok(())
    }

    async fn extract_score_table(&self) -> DriverResult<Vec<Vec<String>>> {
        let sessions = self.sessions.lock().unwrap();
        let pos = self.position.lock().unwrap();
        let (Some(si), Some(ji), Some(ui)) = (pos.session, pos.subject, pos.unit) else {
            return Err(DriverError::Extraction("no unit selected".into()));
        };
        if !pos.score_view {
            return Err(DriverError::Extraction("score view not selected".into()));
        }

        let (unit, behaviour) = &sessions[si].subjects[ji].units[ui];
        self.extractions.lock().unwrap().push(unit.clone());
        match behaviour {
            MockUnit::Rows(rows) => Ok(rows.clone()),
            MockUnit::Fail(message) => Err(DriverError::Extraction(message.clone())),
            MockUnit::Missing => Err(DriverError::Extraction("unit not selected".into())),
        }
    }
}

/// 指向临时目录的配置
pub fn test_config(root: &Path) -> Config {
    Config {
        qualification_type: QUALIFICATION.to_string(),
        raw_output_dir: root.join("raw"),
        merged_output_dir: root.join("merged"),
        progress_file: root.join("progress.json"),
        output_log_file: root.join("harvest.log"),
        score_view_label: SCORE_VIEW.to_string(),
        settle_delay_ms: 0,
        ..Config::default()
    }
}
