//! 字段填写 - 业务能力层
//!
//! 填写单个表单字段：等待可见、输入文本、识别控件类型、确认下拉选择、检查校验状态。
//! 本模块不做重试，重试由工作流层的重试阶梯负责。

use phf::phf_set;
use tracing::{debug, info, warn};

use crate::error::{AppResult, AutomationError};
use crate::infrastructure::PageDriver;
use crate::models::{DropdownSettings, FieldSpec, FieldType, TimingSettings};
use crate::services::backoff::BackoffWaiter;

/// 填完后需要检查 `aria-invalid` 的字段
static VALIDATED_FIELDS: phf::Set<&'static str> = phf_set! {
    "project",
    "date",
    "hours",
    "task_description",
};

/// 控件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Text,
    Dropdown,
}

/// 用于识别控件类型的 ARIA 属性
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AriaSnapshot {
    pub haspopup: Option<String>,
    pub role: Option<String>,
    pub expanded: Option<String>,
}

/// 识别控件类型：显式声明优先，否则看 ARIA 属性，任一命中即为下拉框
pub fn classify(explicit: Option<FieldType>, aria: &AriaSnapshot) -> WidgetKind {
    match explicit {
        Some(FieldType::Dropdown) => return WidgetKind::Dropdown,
        Some(FieldType::Text) => return WidgetKind::Text,
        None => {}
    }

    let haspopup = aria
        .haspopup
        .as_deref()
        .is_some_and(|v| v.to_lowercase().contains("listbox"));
    let role = aria
        .role
        .as_deref()
        .is_some_and(|v| v.to_lowercase().contains("combobox"));
    let expanded = aria.expanded.as_deref().is_some_and(|v| !v.is_empty());

    if haspopup || role || expanded {
        WidgetKind::Dropdown
    } else {
        WidgetKind::Text
    }
}

/// 单个字段的填写结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOutcome {
    pub widget: WidgetKind,
    /// 下拉框：是否等到了可见选项（尽力而为）
    pub options_seen: Option<bool>,
    /// 校验字段：页面是否标记为无效（只记录日志）
    pub marked_invalid: Option<bool>,
}

/// 字段填写器
#[derive(Debug, Clone)]
pub struct FieldFiller {
    waiter: BackoffWaiter,
    timing: TimingSettings,
    dropdown: DropdownSettings,
}

impl FieldFiller {
    pub fn new(waiter: BackoffWaiter, timing: TimingSettings, dropdown: DropdownSettings) -> Self {
        Self {
            waiter,
            timing,
            dropdown,
        }
    }

    /// 填写一个字段
    ///
    /// # 错误
    /// - `LocatorNotFound`: 字段没有定位器
    /// - `ElementNotVisible`: 等待可见超时
    /// - `DropdownCommitFailed`: 下拉框确认按键发送失败
    pub async fn fill_field<D: PageDriver>(
        &self,
        page: &D,
        spec: &FieldSpec,
        value: &str,
    ) -> AppResult<FillOutcome> {
        let field = spec.key.as_str();
        let locator = spec.locator.trim();
        debug!(field, stage = "start", "开始填写字段");

        if locator.is_empty() {
            return Err(AutomationError::LocatorNotFound {
                field: field.to_string(),
            }
            .into());
        }

        let visible = self
            .waiter
            .wait_until(
                || async move { page.is_visible(locator).await.unwrap_or(false) },
                self.timing.policy(self.timing.field_visible_ms),
            )
            .await;
        if !visible {
            return Err(AutomationError::ElementNotVisible {
                field: field.to_string(),
                locator: locator.to_string(),
                waited_ms: self.timing.field_visible_ms,
            }
            .into());
        }

        // 下拉框也先输入文本，用于过滤选项
        page.clear_and_type(locator, value).await?;
        debug!(field, stage = "text-filled", "文本已输入");

        let aria = if spec.field_type.is_some() {
            AriaSnapshot::default()
        } else {
            self.read_aria(page, locator).await
        };
        let widget = classify(spec.field_type, &aria);

        let options_seen = match widget {
            WidgetKind::Dropdown => {
                let seen = self.commit_dropdown(page, field, locator).await?;
                debug!(field, stage = "dropdown-handled", options_seen = seen, "下拉框已确认");
                Some(seen)
            }
            WidgetKind::Text => None,
        };

        let marked_invalid = if VALIDATED_FIELDS.contains(field) {
            let invalid = page
                .attribute(locator, "aria-invalid")
                .await
                .ok()
                .flatten()
                .is_some_and(|v| v == "true");
            if invalid {
                warn!(field, "页面将字段标记为无效: '{}'", value);
            }
            Some(invalid)
        } else {
            None
        };

        info!(field, stage = "complete", widget = ?widget, "字段填写完成");
        Ok(FillOutcome {
            widget,
            options_seen,
            marked_invalid,
        })
    }

    async fn read_aria<D: PageDriver>(&self, page: &D, locator: &str) -> AriaSnapshot {
        AriaSnapshot {
            haspopup: page.attribute(locator, "aria-haspopup").await.ok().flatten(),
            role: page.attribute(locator, "role").await.ok().flatten(),
            expanded: page.attribute(locator, "aria-expanded").await.ok().flatten(),
        }
    }

    /// 等待选项出现（失败不致命），再用按键确认（失败致命）
    async fn commit_dropdown<D: PageDriver>(
        &self,
        page: &D,
        field: &str,
        locator: &str,
    ) -> AppResult<bool> {
        let selectors = &self.dropdown.option_selectors;
        let options_seen = self
            .waiter
            .wait_until(
                || async move {
                    for selector in selectors {
                        if page.is_visible(selector).await.unwrap_or(false) {
                            return true;
                        }
                    }
                    false
                },
                self.timing.policy(self.timing.option_wait_ms),
            )
            .await;
        if !options_seen {
            warn!(field, "未等到下拉选项，继续尝试确认");
        }

        let commit_failed = |e: crate::error::AppError| AutomationError::DropdownCommitFailed {
            field: field.to_string(),
            reason: e.to_string(),
        };

        if let Some(key) = self.dropdown.highlight_key.as_deref() {
            page.press_key(locator, key).await.map_err(commit_failed)?;
        }
        page.press_key(locator, &self.dropdown.activation_key)
            .await
            .map_err(commit_failed)?;

        Ok(options_seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::infrastructure::fake_page::{FakeElement, FakePage};
    use crate::models::FieldRule;

    fn filler() -> FieldFiller {
        let timing = TimingSettings {
            field_visible_ms: 500,
            option_wait_ms: 200,
            ..TimingSettings::default()
        };
        FieldFiller::new(BackoffWaiter::new(true), timing, DropdownSettings::default())
    }

    #[test]
    fn test_classify_explicit_type_wins() {
        let aria = AriaSnapshot {
            role: Some("combobox".into()),
            ..Default::default()
        };
        assert_eq!(classify(Some(FieldType::Text), &aria), WidgetKind::Text);
        assert_eq!(
            classify(Some(FieldType::Dropdown), &AriaSnapshot::default()),
            WidgetKind::Dropdown
        );
    }

    #[test]
    fn test_classify_by_aria() {
        let none = AriaSnapshot::default();
        assert_eq!(classify(None, &none), WidgetKind::Text);

        let popup = AriaSnapshot {
            haspopup: Some("Listbox".into()),
            ..Default::default()
        };
        assert_eq!(classify(None, &popup), WidgetKind::Dropdown);

        let role = AriaSnapshot {
            role: Some("combobox".into()),
            ..Default::default()
        };
        assert_eq!(classify(None, &role), WidgetKind::Dropdown);

        let expanded = AriaSnapshot {
            expanded: Some("false".into()),
            ..Default::default()
        };
        assert_eq!(classify(None, &expanded), WidgetKind::Dropdown);

        let empty_expanded = AriaSnapshot {
            expanded: Some(String::new()),
            haspopup: Some("menu".into()),
            ..Default::default()
        };
        assert_eq!(classify(None, &empty_expanded), WidgetKind::Text);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_locator_is_config_error() {
        let page = FakePage::new();
        let spec = FieldSpec::new("project", "Project", "");
        let err = filler().fill_field(&page, &spec, "P").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Automation(AutomationError::LocatorNotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_element_never_visible() {
        let page = FakePage::new();
        let spec = FieldSpec::new("hours", "Hours", "#hours");
        let err = filler().fill_field(&page, &spec, "1.00").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Automation(AutomationError::ElementNotVisible { waited_ms: 500, .. })
        ));
        assert!(page.typed.borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_field_after_delayed_visibility() {
        let page = FakePage::new();
        page.add_element(
            "#desc",
            FakeElement {
                hidden_polls: 2,
                ..Default::default()
            },
        );
        let spec = FieldSpec::new("task_description", "Task", "#desc").rule(FieldRule::Required);

        let outcome = filler().fill_field(&page, &spec, "Wrote docs").await.unwrap();
        assert_eq!(outcome.widget, WidgetKind::Text);
        assert_eq!(outcome.options_seen, None);
        assert_eq!(outcome.marked_invalid, Some(false));
        assert_eq!(page.typed_into("#desc"), vec!["Wrote docs".to_string()]);
        assert!(page.keys.borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_aria_dropdown_is_committed_with_keys() {
        let page = FakePage::new()
            .with_element("#tool")
            .with_attribute("#tool", "role", "combobox")
            .with_element("[role='option']");
        let spec = FieldSpec::new("tool", "Tool", "#tool");

        let outcome = filler().fill_field(&page, &spec, "Hammer").await.unwrap();
        assert_eq!(outcome.widget, WidgetKind::Dropdown);
        assert_eq!(outcome.options_seen, Some(true));
        // tool 不在校验字段中
        assert_eq!(outcome.marked_invalid, None);

        let keys: Vec<String> = page.keys.borrow().iter().map(|(_, k)| k.clone()).collect();
        assert_eq!(keys, vec!["ArrowDown".to_string(), "Enter".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropdown_without_options_still_commits() {
        let page = FakePage::new().with_element("#project");
        let spec = FieldSpec::new("project", "Project", "#project").dropdown();

        let outcome = filler().fill_field(&page, &spec, "P").await.unwrap();
        assert_eq!(outcome.options_seen, Some(false));
        assert_eq!(page.keys.borrow().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropdown_key_failure_is_fatal() {
        let page = FakePage::new()
            .with_element("#project")
            .with_element("[role='option']");
        page.fail_key_press.set(true);
        let spec = FieldSpec::new("project", "Project", "#project").dropdown();

        let err = filler().fill_field(&page, &spec, "P").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Automation(AutomationError::DropdownCommitFailed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_marker_is_only_logged() {
        let page = FakePage::new()
            .with_element("#date")
            .with_attribute("#date", "aria-invalid", "true");
        let spec = FieldSpec::new("date", "Date", "#date").rule(FieldRule::UsDate);

        let outcome = filler().fill_field(&page, &spec, "13/45/2025").await.unwrap();
        assert_eq!(outcome.marked_invalid, Some(true));
    }
}
