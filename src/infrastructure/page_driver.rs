//! 页面驱动
//!
//! 业务层只通过 `PageDriver` 操作页面：可见性、输入、按键、点击、读属性。
//! `CdpPage` 是基于 chromiumoxide 的实现，测试里换成内存中的假页面。

use std::time::Duration;

use chromiumoxide::{Element, Page};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::js_executor::{js_string, JsExecutor};
use crate::infrastructure::response_observer::{CdpResponseObserver, ResponseLog};

/// 页面操作能力
///
/// 所有选择器都按 `JsExecutor` 中的简化规则解析（CSS + 末尾 `:has-text('...')`）。
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    type Observer: ResponseLog;

    /// 导航到指定 URL
    async fn goto(&self, url: &str) -> AppResult<()>;

    /// 文档是否加载完成
    async fn is_ready(&self) -> AppResult<bool>;

    /// 是否存在可见的匹配元素
    async fn is_visible(&self, selector: &str) -> AppResult<bool>;

    /// 第一个可见匹配元素是否可用（未 disabled 且非 aria-disabled）
    async fn is_enabled(&self, selector: &str) -> AppResult<bool>;

    /// 读取第一个可见匹配元素的属性（都不可见时取第一个匹配元素）
    async fn attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>>;

    /// 清空第一个可见匹配元素并输入文本
    async fn clear_and_type(&self, selector: &str, value: &str) -> AppResult<()>;

    /// 在第一个可见匹配元素上按键
    async fn press_key(&self, selector: &str, key: &str) -> AppResult<()>;

    /// 点击第一个可见匹配元素
    async fn click(&self, selector: &str) -> AppResult<()>;

    /// 页面可见文本是否包含给定短语（不区分大小写）
    async fn contains_text(&self, phrase: &str) -> AppResult<bool>;

    /// 开始观察网络响应，返回的观察器被 drop 时停止
    async fn observe_responses(&self) -> AppResult<Self::Observer>;
}

/// 基于 chromiumoxide 的页面
pub struct CdpPage {
    executor: JsExecutor,
    navigation_timeout: Duration,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self {
            executor: JsExecutor::new(page),
            navigation_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn page(&self) -> &Page {
        self.executor.page()
    }

    /// 用与 `is_visible` 相同的规则找到第一个可见元素，再取回它的句柄
    ///
    /// 先在页面里给目标打上标记，再按标记查询，保证输入和按键落在同一个可见节点上。
    async fn resolve(&self, selector: &str) -> AppResult<Element> {
        let marked: bool = self.executor.eval_dom(&mark_target_body(selector)).await?;
        if !marked {
            return Err(AppError::Other(format!("没有可见的匹配元素: {}", selector)));
        }
        let element = self.page().find_element(TARGET_SELECTOR).await?;
        Ok(element)
    }
}

const TARGET_ATTR: &str = "data-sp-target";
const TARGET_SELECTOR: &str = "[data-sp-target='1']";

fn mark_target_body(selector: &str) -> String {
    format!(
        r#"
        document.querySelectorAll('[{attr}]').forEach(el => el.removeAttribute('{attr}'));
        const el = __spFirst({sel});
        if (!el) return false;
        el.setAttribute('{attr}', '1');
        return true;
        "#,
        attr = TARGET_ATTR,
        sel = js_string(selector)
    )
}

impl PageDriver for CdpPage {
    type Observer = CdpResponseObserver;

    async fn goto(&self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        let navigate = async {
            self.page().goto(url).await?;
            self.page().wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(self.navigation_timeout, navigate).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AppError::navigation_failed(url, e)),
            Err(elapsed) => Err(AppError::navigation_failed(url, elapsed)),
        }
    }

    async fn is_ready(&self) -> AppResult<bool> {
        self.executor
            .eval_as::<bool>("document.readyState === 'complete'")
            .await
    }

    async fn is_visible(&self, selector: &str) -> AppResult<bool> {
        let body = format!("return __spFirst({}) !== null;", js_string(selector));
        self.executor.eval_dom(&body).await
    }

    async fn is_enabled(&self, selector: &str) -> AppResult<bool> {
        let body = format!(
            r#"
            const el = __spFirst({});
            if (!el) return false;
            return !el.disabled && el.getAttribute('aria-disabled') !== 'true';
            "#,
            js_string(selector)
        );
        self.executor.eval_dom(&body).await
    }

    async fn attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>> {
        let body = format!(
            r#"
            const el = __spFirst({0}) || __spQuery({0})[0];
            return el ? el.getAttribute({1}) : null;
            "#,
            js_string(selector),
            js_string(name)
        );
        self.executor.eval_dom(&body).await
    }

    async fn clear_and_type(&self, selector: &str, value: &str) -> AppResult<()> {
        let element = self.resolve(selector).await?;
        element.click().await?;
        element
            .call_js_fn(
                "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
                false,
            )
            .await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> AppResult<()> {
        let element = self.resolve(selector).await?;
        element.press_key(key).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        let body = format!(
            r#"
            const el = __spFirst({});
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
            "#,
            js_string(selector)
        );
        let clicked: bool = self.executor.eval_dom(&body).await?;
        if clicked {
            Ok(())
        } else {
            Err(AppError::Other(format!("没有可点击的元素: {}", selector)))
        }
    }

    async fn contains_text(&self, phrase: &str) -> AppResult<bool> {
        let body = format!(
            r#"
            const text = document.body ? (document.body.innerText || '') : '';
            return text.toLowerCase().includes({}.toLowerCase());
            "#,
            js_string(phrase)
        );
        self.executor.eval_dom(&body).await
    }

    async fn observe_responses(&self) -> AppResult<Self::Observer> {
        CdpResponseObserver::register(self.page()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_is_resolved_like_visibility_checks() {
        let body = mark_target_body("button:has-text('Submit')");
        assert!(body.contains(r#"__spFirst("button:has-text('Submit')")"#));
        assert!(body.contains("removeAttribute('data-sp-target')"));
        assert!(body.contains("setAttribute('data-sp-target', '1')"));
        assert_eq!(TARGET_SELECTOR, format!("[{}='1']", TARGET_ATTR));
    }
}
