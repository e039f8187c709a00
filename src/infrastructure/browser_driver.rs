//! 基于浏览器页面的驱动实现
//!
//! 下拉框层级通过修改 `<select>` 并派发 change 事件完成选择，
//! 成绩视图按文字查找可点击元素，成绩表按行读取单元格文本。
//! 考试类型下拉框在列出或选择考试季之前由驱动自行定位，编排层不需要选择它。

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::config::Selectors;
use crate::error::{DriverError, DriverResult};
use crate::infrastructure::driver::PageDriver;
use crate::infrastructure::js_executor::{js_string, JsExecutor};
use crate::models::Level;

/// 浏览器页面驱动
pub struct BrowserDriver {
    executor: JsExecutor,
    selectors: Selectors,
    qualification: String,
    settle_delay: Duration,
}

impl BrowserDriver {
    pub fn new(
        executor: JsExecutor,
        selectors: Selectors,
        qualification: String,
        settle_delay: Duration,
    ) -> Self {
        Self {
            executor,
            selectors,
            qualification,
            settle_delay,
        }
    }

    fn selector(&self, level: Level) -> &str {
        match level {
            Level::Qualification => &self.selectors.qualification,
            Level::Session => &self.selectors.session,
            Level::Subject => &self.selectors.subject,
            Level::Unit => &self.selectors.unit,
            Level::ScoreView => &self.selectors.score_view,
        }
    }

    /// 等待页面刷新下一级选项
    async fn settle(&self) {
        sleep(self.settle_delay).await;
    }

    /// 考试类型下拉框不是目标值时切换过去；已经是目标值时不触发 change
    async fn ensure_qualification(&self) -> DriverResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({sel});
                if (!el) return null;
                const opt = Array.from(el.options).find(o => o.textContent.trim() === {label});
                if (!opt) return null;
                if (el.value === opt.value) return false;
                el.value = opt.value;
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            sel = js_string(&self.selectors.qualification),
            label = js_string(&self.qualification)
        );

        let changed: Option<bool> = self.executor.eval_as(js_code).await?;
        match changed {
            None => Err(DriverError::not_found(Level::Qualification, &self.qualification)),
            Some(true) => {
                debug!("已切换考试类型: {}", self.qualification);
                self.settle().await;
                Ok(())
            }
            Some(false) => Ok(()),
        }
    }
}

impl PageDriver for BrowserDriver {
    async fn list_options(&self, level: Level) -> DriverResult<Vec<String>> {
        if level == Level::Session {
            self.ensure_qualification().await?;
        }
        let selector = self.selector(level);
        let js_code = if level == Level::ScoreView {
            format!(
                r#"
                (() => {{
                    return Array.from(document.querySelectorAll({sel}))
                        .map(e => e.textContent.trim())
                        .filter(t => t.length > 0);
                }})()
                "#,
                sel = js_string(selector)
            )
        } else {
            format!(
                r#"
                (() => {{
                    const el = document.querySelector({sel});
                    if (!el) return null;
                    return Array.from(el.options)
                        .filter(o => !o.disabled && o.value !== '')
                        .map(o => o.textContent.trim());
                }})()
                "#,
                sel = js_string(selector)
            )
        };

        let options: Option<Vec<String>> = self.executor.eval_as(js_code).await?;
        let options = options.ok_or_else(|| {
            DriverError::Extraction(format!("页面上找不到 {} 控件: {}", level, selector))
        })?;

        debug!("{} 共 {} 个选项", level, options.len());
        Ok(options)
    }

    async fn select(&self, level: Level, label: &str) -> DriverResult<()> {
        if level == Level::Session {
            self.ensure_qualification().await?;
        }
        let selector = self.selector(level);
        let js_code = if level == Level::ScoreView {
            format!(
                r#"
                (() => {{
                    const target = Array.from(document.querySelectorAll({sel}))
                        .find(e => e.textContent.trim() === {label});
                    if (!target) return false;
                    target.click();
                    return true;
                }})()
                "#,
                sel = js_string(selector),
                label = js_string(label)
            )
        } else {
            format!(
                r#"
                (() => {{
                    const el = document.querySelector({sel});
                    if (!el) return false;
                    const opt = Array.from(el.options).find(o => o.textContent.trim() === {label});
                    if (!opt) return false;
                    el.value = opt.value;
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }})()
                "#,
                sel = js_string(selector),
                label = js_string(label)
            )
        };

        let found: bool = self.executor.eval_as(js_code).await?;
        if !found {
            return Err(DriverError::not_found(level, label));
        }

        debug!("已选择 {}: {}", level, label);
        self.settle().await;
        Ok(())
    }

    async fn extract_score_table(&self) -> DriverResult<Vec<Vec<String>>> {
        let js_code = format!(
            r#"
            (() => {{
                const rows = Array.from(document.querySelectorAll({sel}));
                if (rows.length === 0) return null;
                return rows.map(r => Array.from(r.querySelectorAll('td, th')).map(c => c.textContent.trim()));
            }})()
            "#,
            sel = js_string(&self.selectors.table_rows)
        );

        let rows: Option<Vec<Vec<String>>> = self.executor.eval_as(js_code).await?;
        rows.ok_or_else(|| DriverError::Extraction("页面上没有成绩表".to_string()))
    }
}
