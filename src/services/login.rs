//! 登录流程 - 业务能力层
//!
//! 先导航到入口页（固定次数重试、固定间隔），再依次执行配置的登录步骤。
//! 可选步骤超时直接跳过；必需步骤超时中止整个运行。

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, AutomationError};
use crate::infrastructure::PageDriver;
use crate::models::{LoginAction, LoginStep, TimingSettings};
use crate::services::backoff::BackoffWaiter;
use crate::utils::logging::redact_email;

/// 登录凭据
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn value_for(&self, key: &str) -> Option<&str> {
        match key {
            "email" => Some(&self.email),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

// 密码永远不进日志
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &redact_email(&self.email))
            .field("password", &"<redacted>")
            .finish()
    }
}

/// 登录流程
#[derive(Debug, Clone)]
pub struct LoginFlow {
    waiter: BackoffWaiter,
    timing: TimingSettings,
    steps: Vec<LoginStep>,
    base_url: String,
}

impl LoginFlow {
    pub fn new(
        waiter: BackoffWaiter,
        timing: TimingSettings,
        steps: Vec<LoginStep>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            waiter,
            timing,
            steps,
            base_url: base_url.into(),
        }
    }

    /// 执行完整登录
    pub async fn run<D: PageDriver>(&self, page: &D, credentials: &Credentials) -> AppResult<()> {
        info!(
            steps = self.steps.len(),
            email = %redact_email(&credentials.email),
            "开始登录"
        );

        self.navigate_with_retry(page).await?;

        let total = self.steps.len();
        for (i, step) in self.steps.iter().enumerate() {
            info!(step = i + 1, total, name = %step.name, "执行登录步骤");

            match self.execute_step(page, step, credentials).await {
                Ok(true) => debug!(step = %step.name, "步骤完成"),
                Ok(false) => warn!(step = %step.name, "可选步骤超时，已跳过"),
                Err(e) if step.optional && !is_config_error(&e) => {
                    warn!(step = %step.name, "可选步骤失败，继续: {}", e);
                }
                Err(e) => {
                    tracing::error!(step = %step.name, "必需步骤失败: {}", e);
                    return Err(e);
                }
            }
        }

        info!("✅ 登录完成");
        Ok(())
    }

    async fn navigate_with_retry<D: PageDriver>(&self, page: &D) -> AppResult<()> {
        let max_attempts = self.timing.login_max_attempts.max(1);
        for attempt in 1..=max_attempts {
            debug!(attempt, max_attempts, "导航尝试");
            match page.goto(&self.base_url).await {
                Ok(()) => {
                    self.wait_ready(page).await;
                    info!("已打开入口页: {}", self.base_url);
                    return Ok(());
                }
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    warn!(attempt, "导航失败，稍后重试: {}", e);
                    tokio::time::sleep(Duration::from_millis(self.timing.login_retry_backoff_ms))
                        .await;
                }
            }
        }
        // max_attempts >= 1，循环一定会返回
        Err(AppError::Other(format!("无法打开 {}", self.base_url)))
    }

    /// 执行单个步骤
    ///
    /// 返回 Ok(false) 表示可选步骤的元素没有出现，已跳过
    async fn execute_step<D: PageDriver>(
        &self,
        page: &D,
        step: &LoginStep,
        credentials: &Credentials,
    ) -> AppResult<bool> {
        if step.locator.trim().is_empty() {
            return Err(AutomationError::LoginStepInvalid {
                step: step.name.clone(),
                reason: "缺少定位器".to_string(),
            }
            .into());
        }

        let locator = step.locator.as_str();
        let visible = self
            .waiter
            .wait_until(
                || async move { page.is_visible(locator).await.unwrap_or(false) },
                self.timing.policy(self.timing.login_step_ms),
            )
            .await;
        if !visible {
            if step.optional {
                return Ok(false);
            }
            return Err(AutomationError::LoginStepTimeout {
                step: step.name.clone(),
            }
            .into());
        }

        match step.action {
            LoginAction::Wait => {}
            LoginAction::Input => {
                let key = step.value_key.as_deref().unwrap_or_default();
                let value =
                    credentials
                        .value_for(key)
                        .ok_or_else(|| AutomationError::LoginStepInvalid {
                            step: step.name.clone(),
                            reason: format!("未知的取值键: '{}'", key),
                        })?;
                let shown = if step.sensitive { "<redacted>" } else { value };
                debug!(locator, value = shown, "填写输入框");
                page.clear_and_type(locator, value).await?;
            }
            LoginAction::Click => {
                debug!(locator, "点击");
                page.click(locator).await?;
                if step.expects_navigation {
                    self.wait_ready(page).await;
                }
            }
        }
        Ok(true)
    }

    // 页面没就绪也继续，后续步骤自己会等元素
    async fn wait_ready<D: PageDriver>(&self, page: &D) {
        let ready = self
            .waiter
            .wait_until(
                || async move { page.is_ready().await.unwrap_or(false) },
                self.timing.policy(self.timing.navigation_ms),
            )
            .await;
        if !ready {
            debug!("等待页面就绪超时");
        }
    }
}

fn is_config_error(err: &AppError) -> bool {
    matches!(
        err,
        AppError::Automation(AutomationError::LoginStepInvalid { .. })
    )
}
