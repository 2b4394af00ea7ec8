//! 自动化配置
//!
//! 表单字段表、季度窗口表、登录步骤表和提交校验设置都来自这里。
//! 没有配置文件时使用内置的默认配置（与供应商表单一致）。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::{AppResult, ConfigError};
use crate::models::field_spec::{FieldRule, FieldSpec};
use crate::models::login_step::LoginStep;
use crate::models::quarter::QuarterWindow;
use crate::services::backoff::BackoffPolicy;

/// 完整的自动化配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationProfile {
    /// 按填写顺序排列的字段
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldSpec>,
    /// 当前季度与上一季度
    #[serde(default = "default_quarters")]
    pub quarters: Vec<QuarterWindow>,
    #[serde(default = "default_login_steps")]
    pub login_steps: Vec<LoginStep>,
    #[serde(default)]
    pub submission: SubmissionSettings,
    #[serde(default)]
    pub dropdown: DropdownSettings,
    #[serde(default)]
    pub timing: TimingSettings,
}

impl Default for AutomationProfile {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            quarters: default_quarters(),
            login_steps: default_login_steps(),
            submission: SubmissionSettings::default(),
            dropdown: DropdownSettings::default(),
            timing: TimingSettings::default(),
        }
    }
}

impl AutomationProfile {
    /// 检查配置的结构性问题
    pub fn validate(&self) -> AppResult<()> {
        if self.fields.is_empty() {
            return Err(ConfigError::InvalidProfile("字段列表为空".to_string()).into());
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.key.trim().is_empty() {
                return Err(ConfigError::InvalidProfile(format!(
                    "字段 '{}' 缺少 key",
                    field.label
                ))
                .into());
            }
            if !seen.insert(field.key.as_str()) {
                return Err(ConfigError::InvalidProfile(format!(
                    "字段 key 重复: {}",
                    field.key
                ))
                .into());
            }
        }

        self.timing.validate()?;

        if self.submission.submit_selectors.is_empty() {
            return Err(ConfigError::InvalidProfile("没有配置提交按钮选择器".to_string()).into());
        }
        if self.submission.success_status_min > self.submission.success_status_max {
            return Err(ConfigError::InvalidProfile(format!(
                "成功状态码范围无效: {}-{}",
                self.submission.success_status_min, self.submission.success_status_max
            ))
            .into());
        }

        Ok(())
    }
}

/// 提交校验设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionSettings {
    /// 主选择器在前，其余为后备
    pub submit_selectors: Vec<String>,
    /// 只点击未禁用且非 aria-disabled 的按钮
    pub require_enabled: bool,
    pub success_status_min: u16,
    pub success_status_max: u16,
    /// 提交接口 URL 模式（`*` 会被去掉后做子串匹配）
    pub success_url_patterns: Vec<String>,
    /// 页面或响应体中表示成功的文本
    pub success_phrases: Vec<String>,
    /// 是否检查响应体内容
    pub validate_content: bool,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            submit_selectors: [
                "button[data-client-id='form_submit_btn']",
                "button:has-text('Submit')",
                "input[type='submit']",
                "button[type='submit']",
                "button.submit",
                "button[aria-label*='submit']",
                "button[title*='submit']",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            require_enabled: true,
            success_status_min: 200,
            success_status_max: 299,
            success_url_patterns: vec![
                "*forms.smartsheet.com/api/submit*".to_string(),
                "*/api/submit*".to_string(),
            ],
            success_phrases: [
                "success! we've captured your submission",
                "form submitted successfully",
                "thank you for your submission",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            validate_content: false,
        }
    }
}

/// 下拉框设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropdownSettings {
    /// 选项容器模式，按优先级排列
    pub option_selectors: Vec<String>,
    /// 确认前用来高亮第一个过滤结果的键，为空则不按
    pub highlight_key: Option<String>,
    /// 确认选择时按下的键
    pub activation_key: String,
}

impl Default for DropdownSettings {
    fn default() -> Self {
        Self {
            option_selectors: [
                "[role='listbox'] [role='option']",
                "[role='option']",
                "ul[role='listbox'] li",
                ".dropdown-menu li",
                ".select-options li",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            highlight_key: Some("ArrowDown".to_string()),
            activation_key: "Enter".to_string(),
        }
    }
}

/// 各类等待与延迟（毫秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub base_ms: u64,
    pub multiplier: f64,
    pub field_visible_ms: u64,
    pub option_wait_ms: u64,
    pub submit_verify_ms: u64,
    pub login_step_ms: u64,
    pub navigation_ms: u64,
    pub login_max_attempts: usize,
    pub login_retry_backoff_ms: u64,
    pub quick_retry_delay_ms: u64,
    pub full_refill_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            base_ms: 100,
            multiplier: 2.0,
            field_visible_ms: 10_000,
            option_wait_ms: 3_000,
            submit_verify_ms: 15_000,
            login_step_ms: 15_000,
            navigation_ms: 10_000,
            login_max_attempts: 3,
            login_retry_backoff_ms: 2_000,
            quick_retry_delay_ms: 1_000,
            full_refill_delay_ms: 3_000,
        }
    }
}

impl TimingSettings {
    /// 退避参数必须让间隔单调不减且有限
    pub fn validate(&self) -> AppResult<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidProfile(format!(
                "退避倍数必须是不小于 1.0 的有限值: {}",
                self.multiplier
            ))
            .into());
        }
        if self.base_ms == 0 {
            return Err(ConfigError::InvalidProfile("退避初始间隔 base_ms 不能为 0".to_string()).into());
        }
        Ok(())
    }

    /// 以统一的 base / multiplier 构造一个上限为 `max_ms` 的退避策略
    pub fn policy(&self, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.base_ms),
            Duration::from_millis(max_ms),
            self.multiplier,
        )
    }
}

fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("project", "Project", "input[aria-label='Project']")
            .dropdown()
            .rule(FieldRule::Required),
        FieldSpec::new("date", "Date", "input[placeholder='mm/dd/yyyy']").rule(FieldRule::UsDate),
        FieldSpec::new("hours", "Hours", "input[aria-label='Hours']").rule(FieldRule::Hours),
        FieldSpec::new("tool", "Tool", "input[aria-label*='Tool']")
            .dropdown()
            .optional(),
        FieldSpec::new(
            "task_description",
            "Task Description",
            "textarea[aria-label='Task Description']",
        )
        .rule(FieldRule::MaxLength(500)),
        FieldSpec::new(
            "detail_code",
            "Detail Charge Code",
            "input[aria-label='Detail Charge Code']",
        )
        .dropdown()
        .optional(),
    ]
}

fn default_quarters() -> Vec<QuarterWindow> {
    vec![
        QuarterWindow::new(
            "Q3-2025",
            "Q3 2025",
            "2025-07-01",
            "2025-09-30",
            "0197cbae7daf72bdb96b3395b500d414",
        ),
        QuarterWindow::new(
            "Q4-2025",
            "Q4 2025",
            "2025-10-01",
            "2025-12-31",
            "0199fabee6497e60abb6030c48d84585",
        ),
    ]
}

fn default_login_steps() -> Vec<LoginStep> {
    vec![
        LoginStep::wait("Wait for Login Form", "#loginEmail", true),
        LoginStep::input("Email Input", "#loginEmail", "email"),
        LoginStep::click("Continue", "#formControl", true),
        LoginStep::click("Login with company account", "a.clsJspButtonWide", true),
        LoginStep::wait("Wait for AAD Email", "#i0116", false),
        LoginStep::input("AAD Email", "#i0116", "email"),
        LoginStep::click("AAD Next", "#idSIButton9", true),
        LoginStep::wait("Wait for Password", "#passwordInput", false),
        LoginStep::input("Password Input", "#passwordInput", "password"),
        LoginStep::click("Password Submit", "#submitButton", true),
        LoginStep::click("Stay Signed In - No", "#idBtn_Back", true),
        LoginStep::wait("Wait for Form Page Ready", "input[aria-label='Project']", false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = AutomationProfile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.quarters.len(), 2);
        assert_eq!(profile.fields[0].key, "project");
    }

    #[test]
    fn test_duplicate_field_keys_rejected() {
        let mut profile = AutomationProfile::default();
        let dup = profile.fields[0].clone();
        profile.fields.push(dup);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_bad_backoff_settings_rejected() {
        for bad in ["multiplier = -2.0", "multiplier = nan", "multiplier = 0.5", "base_ms = 0"] {
            let profile: AutomationProfile =
                toml::from_str(&format!("[timing]\n{}", bad)).unwrap();
            assert!(profile.validate().is_err(), "{} 应被拒绝", bad);
        }

        let profile: AutomationProfile = toml::from_str("[timing]\nmultiplier = 1.0").unwrap();
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let profile: AutomationProfile = toml::from_str(
            r#"
            [submission]
            validate_content = true

            [timing]
            quick_retry_delay_ms = 10
            "#,
        )
        .unwrap();
        assert!(profile.submission.validate_content);
        assert_eq!(profile.submission.success_status_min, 200);
        assert_eq!(profile.timing.quick_retry_delay_ms, 10);
        assert_eq!(profile.timing.full_refill_delay_ms, 3_000);
        assert_eq!(profile.fields.len(), 6);
    }
}
