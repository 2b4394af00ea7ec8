//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{AppResult, BrowserError};

/// 所有 DOM 查询共用的辅助函数
///
/// `__spQuery` 支持普通 CSS 选择器，以及末尾带 `:has-text('...')` 的简化写法
/// （先按前半段查询，再按文本过滤）。这不是完整的选择器引擎。
const DOM_PRELUDE: &str = r#"
    const __spQuery = (sel) => {
        const m = sel.match(/^(.*):has-text\((['"])(.*)\2\)$/);
        if (m) {
            const base = m[1] && m[1].length > 0 ? m[1] : '*';
            return Array.from(document.querySelectorAll(base))
                .filter(el => (el.textContent || '').includes(m[3]));
        }
        return Array.from(document.querySelectorAll(sel));
    };
    const __spVisible = (el) => {
        const r = el.getBoundingClientRect();
        const s = window.getComputedStyle(el);
        return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
    };
    const __spFirst = (sel) => __spQuery(sel).find(__spVisible) || null;
"#;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识工时条目 / 表单字段
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await.map_err(|e| {
            BrowserError::ScriptExecutionFailed {
                source: Box::new(e),
            }
        })?;
        let json_value = result.into_value().unwrap_or(JsonValue::Null);
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 在带有 DOM 辅助函数的作用域里执行一段函数体
    ///
    /// # 参数
    /// - `body`: 函数体，需要自己 `return` 结果
    pub async fn eval_dom<T: DeserializeOwned>(&self, body: &str) -> AppResult<T> {
        let js_code = format!("(() => {{ {} {} }})()", DOM_PRELUDE, body);
        self.eval_as(js_code).await
    }
}

/// 把字符串编码为 JS 字面量
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
