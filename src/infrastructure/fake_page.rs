//! 测试用的内存页面

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::page_driver::PageDriver;
use crate::infrastructure::response_observer::{ObservedResponse, ResponseLog};

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    /// 前 N 次可见性检查返回 false
    pub hidden_polls: u32,
    pub disabled: bool,
    pub attributes: HashMap<String, String>,
}

/// 一次点击带来的页面变化
#[derive(Debug, Clone, Default)]
pub struct ClickEffect {
    pub responses: Vec<(ObservedResponse, Option<String>)>,
    pub page_text: Option<String>,
}

#[derive(Default)]
pub struct FakePage {
    elements: RefCell<HashMap<String, FakeElement>>,
    click_effects: RefCell<VecDeque<ClickEffect>>,
    network: Rc<RefCell<Vec<ObservedResponse>>>,
    bodies: Rc<RefCell<HashMap<String, String>>>,
    page_text: RefCell<String>,
    pub typed: RefCell<Vec<(String, String)>>,
    pub keys: RefCell<Vec<(String, String)>>,
    pub clicks: RefCell<Vec<String>>,
    pub visited: RefCell<Vec<String>>,
    pub fail_key_press: Cell<bool>,
    /// 前 N 次输入以浏览器错误失败
    pub type_failures: Cell<u32>,
    pub goto_failures: Cell<u32>,
    active_observers: Rc<Cell<usize>>,
    pub observers_opened: Cell<usize>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, selector: &str) -> Self {
        self.add_element(selector, FakeElement::default());
        self
    }

    pub fn with_attribute(self, selector: &str, name: &str, value: &str) -> Self {
        self.elements
            .borrow_mut()
            .entry(selector.to_string())
            .or_default()
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn add_element(&self, selector: &str, element: FakeElement) {
        self.elements
            .borrow_mut()
            .insert(selector.to_string(), element);
    }

    pub fn push_click_effect(&self, effect: ClickEffect) {
        self.click_effects.borrow_mut().push_back(effect);
    }

    pub fn set_page_text(&self, text: &str) {
        *self.page_text.borrow_mut() = text.to_string();
    }

    /// 当前仍未注销的观察器数量
    pub fn active_observers(&self) -> usize {
        self.active_observers.get()
    }

    pub fn typed_into(&self, selector: &str) -> Vec<String> {
        self.typed
            .borrow()
            .iter()
            .filter(|(s, _)| s == selector)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

pub fn response(id: &str, url: &str, status: u16) -> ObservedResponse {
    ObservedResponse {
        request_id: id.to_string(),
        url: url.to_string(),
        status,
    }
}

impl PageDriver for FakePage {
    type Observer = FakeObserver;

    async fn goto(&self, url: &str) -> AppResult<()> {
        self.visited.borrow_mut().push(url.to_string());
        if self.goto_failures.get() > 0 {
            self.goto_failures.set(self.goto_failures.get() - 1);
            return Err(AppError::Other(format!("导航失败: {}", url)));
        }
        Ok(())
    }

    async fn is_ready(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn is_visible(&self, selector: &str) -> AppResult<bool> {
        let mut elements = self.elements.borrow_mut();
        match elements.get_mut(selector) {
            Some(el) if el.hidden_polls > 0 => {
                el.hidden_polls -= 1;
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn is_enabled(&self, selector: &str) -> AppResult<bool> {
        Ok(self
            .elements
            .borrow()
            .get(selector)
            .map(|el| {
                !el.disabled
                    && el.attributes.get("aria-disabled").map(String::as_str) != Some("true")
            })
            .unwrap_or(false))
    }

    async fn attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>> {
        Ok(self
            .elements
            .borrow()
            .get(selector)
            .and_then(|el| el.attributes.get(name).cloned()))
    }

    async fn clear_and_type(&self, selector: &str, value: &str) -> AppResult<()> {
        if !self.elements.borrow().contains_key(selector) {
            return Err(AppError::Other(format!("元素不存在: {}", selector)));
        }
        if self.type_failures.get() > 0 {
            self.type_failures.set(self.type_failures.get() - 1);
            return Err(BrowserError::ScriptExecutionFailed {
                source: "节点已被替换".into(),
            }
            .into());
        }
        self.typed
            .borrow_mut()
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> AppResult<()> {
        if self.fail_key_press.get() {
            return Err(AppError::Other("按键发送失败".to_string()));
        }
        self.keys
            .borrow_mut()
            .push((selector.to_string(), key.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        self.clicks.borrow_mut().push(selector.to_string());
        if let Some(effect) = self.click_effects.borrow_mut().pop_front() {
            for (resp, body) in effect.responses {
                if let Some(body) = body {
                    self.bodies
                        .borrow_mut()
                        .insert(resp.request_id.clone(), body);
                }
                self.network.borrow_mut().push(resp);
            }
            if let Some(text) = effect.page_text {
                *self.page_text.borrow_mut() = text;
            }
        }
        Ok(())
    }

    async fn contains_text(&self, phrase: &str) -> AppResult<bool> {
        Ok(self
            .page_text
            .borrow()
            .to_lowercase()
            .contains(&phrase.to_lowercase()))
    }

    async fn observe_responses(&self) -> AppResult<Self::Observer> {
        self.active_observers.set(self.active_observers.get() + 1);
        self.observers_opened.set(self.observers_opened.get() + 1);
        Ok(FakeObserver {
            network: Rc::clone(&self.network),
            bodies: Rc::clone(&self.bodies),
            start: self.network.borrow().len(),
            active: Rc::clone(&self.active_observers),
        })
    }
}

/// 只看到注册之后的响应
pub struct FakeObserver {
    network: Rc<RefCell<Vec<ObservedResponse>>>,
    bodies: Rc<RefCell<HashMap<String, String>>>,
    start: usize,
    active: Rc<Cell<usize>>,
}

impl ResponseLog for FakeObserver {
    fn recorded(&self) -> Vec<ObservedResponse> {
        self.network.borrow()[self.start..].to_vec()
    }

    async fn body(&self, response: &ObservedResponse) -> Option<String> {
        self.bodies.borrow().get(&response.request_id).cloned()
    }
}

impl Drop for FakeObserver {
    fn drop(&mut self) {
        self.active.set(self.active.get() - 1);
    }
}
