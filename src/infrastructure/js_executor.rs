//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{DriverError, DriverResult};

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识考试季 / 科目 / 单元
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> DriverResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        // 脚本返回 undefined 时没有值
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> DriverResult<T> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(DriverError::browser)
    }
}

/// 把字符串编码为 JS 字面量
pub fn js_string(value: &str) -> String {
    JsonValue::String(value.to_string()).to_string()
}
