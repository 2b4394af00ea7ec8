//! 提交监控 - 业务能力层
//!
//! 点击提交按钮并确认成功。两条确认渠道：
//! - 网络：提交接口返回成功状态码（可选再检查响应体）
//! - 页面：出现成功提示文本
//!
//! URL 模式匹配是简化的：去掉所有 `*` 后做子串匹配，不是真正的 glob，
//! 跨路径段的模式可能误匹配。

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{AppResult, AutomationError};
use crate::infrastructure::{ObservedResponse, PageDriver, ResponseLog};
use crate::models::{SubmissionSettings, TimingSettings};
use crate::services::backoff::BackoffWaiter;

/// 成功是通过哪条渠道确认的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMethod {
    Network,
    Dom,
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub method: Option<VerificationMethod>,
    pub matched_responses: Vec<ObservedResponse>,
    /// 从响应体中解析出的提交 ID
    pub correlation_ids: Vec<String>,
}

/// 简化的 URL 模式匹配：去掉 `*` 后做子串匹配
pub fn url_matches(url: &str, pattern: &str) -> bool {
    let needle: String = pattern.chars().filter(|c| *c != '*').collect();
    !needle.is_empty() && url.contains(&needle)
}

/// 从响应体中解析提交 ID
pub fn parse_submission_id(body: &str) -> Option<String> {
    if let Ok(re) = Regex::new(r#""submissionId"\s*:\s*"?([A-Za-z0-9_-]+)"#) {
        if let Some(caps) = re.captures(body) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

/// 响应是否匹配成功条件（状态码范围 + URL 模式）
pub fn is_success_response(settings: &SubmissionSettings, response: &ObservedResponse) -> bool {
    let status_ok = (settings.success_status_min..=settings.success_status_max)
        .contains(&response.status);
    status_ok
        && settings
            .success_url_patterns
            .iter()
            .any(|p| url_matches(&response.url, p))
}

/// 根据收集到的证据判定提交是否成功
///
/// `bodies` 与 `matched` 一一对应；未启用内容校验时可以为空。
pub fn decide(
    settings: &SubmissionSettings,
    dom_indicator: bool,
    matched: Vec<ObservedResponse>,
    bodies: &[Option<String>],
) -> SubmissionOutcome {
    let correlation_ids: Vec<String> = bodies
        .iter()
        .flatten()
        .filter_map(|b| parse_submission_id(b))
        .collect();

    let network_ok = if matched.is_empty() {
        false
    } else if !settings.validate_content {
        true
    } else {
        let phrase_found = bodies.iter().flatten().any(|body| {
            let lower = body.to_lowercase();
            settings
                .success_phrases
                .iter()
                .any(|p| lower.contains(&p.to_lowercase()))
        });
        phrase_found || !correlation_ids.is_empty()
    };

    let method = if network_ok {
        Some(VerificationMethod::Network)
    } else if dom_indicator {
        Some(VerificationMethod::Dom)
    } else {
        None
    };

    SubmissionOutcome {
        success: method.is_some(),
        method,
        matched_responses: matched,
        correlation_ids,
    }
}

/// 提交监控器
#[derive(Debug, Clone)]
pub struct SubmissionMonitor {
    waiter: BackoffWaiter,
    settings: SubmissionSettings,
    timing: TimingSettings,
}

impl SubmissionMonitor {
    pub fn new(waiter: BackoffWaiter, settings: SubmissionSettings, timing: TimingSettings) -> Self {
        Self {
            waiter,
            settings,
            timing,
        }
    }

    /// 点击提交并确认结果
    ///
    /// 观察器在点击前注册，函数返回（包括出错返回）时随 drop 注销。
    ///
    /// # 错误
    /// - `SubmitControlNotFound`: 没有可用的提交按钮
    pub async fn submit<D: PageDriver>(&self, page: &D) -> AppResult<SubmissionOutcome> {
        let observer = page.observe_responses().await?;

        let selector = self.find_submit_control(page).await?;
        info!("点击提交按钮: {}", selector);
        page.click(&selector).await?;

        let settings = &self.settings;
        let log = &observer;
        let early = self
            .waiter
            .wait_until(
                || async move {
                    if log.recorded().iter().any(|r| is_success_response(settings, r)) {
                        return true;
                    }
                    dom_indicator(page, settings).await
                },
                self.timing.policy(self.timing.submit_verify_ms),
            )
            .await;
        debug!(early, "提交确认等待结束");

        let matched: Vec<ObservedResponse> = observer
            .recorded()
            .into_iter()
            .filter(|r| is_success_response(settings, r))
            .collect();

        let mut bodies = Vec::new();
        if settings.validate_content {
            for response in &matched {
                bodies.push(observer.body(response).await);
            }
        }
        let dom = dom_indicator(page, settings).await;
        drop(observer);

        let outcome = decide(settings, dom, matched, &bodies);
        if outcome.success {
            info!(
                method = ?outcome.method,
                responses = outcome.matched_responses.len(),
                ids = ?outcome.correlation_ids,
                "✅ 提交已确认"
            );
        } else {
            warn!("提交未能确认: 没有匹配的网络响应，也没有成功提示");
        }
        Ok(outcome)
    }

    /// 按顺序找第一个可用的提交按钮
    async fn find_submit_control<D: PageDriver>(&self, page: &D) -> AppResult<String> {
        for selector in &self.settings.submit_selectors {
            if !page.is_visible(selector).await.unwrap_or(false) {
                continue;
            }
            if self.settings.require_enabled && !page.is_enabled(selector).await.unwrap_or(false) {
                debug!("提交按钮不可用，跳过: {}", selector);
                continue;
            }
            return Ok(selector.clone());
        }
        Err(AutomationError::SubmitControlNotFound {
            tried: self.settings.submit_selectors.len(),
        }
        .into())
    }
}

async fn dom_indicator<D: PageDriver>(page: &D, settings: &SubmissionSettings) -> bool {
    for phrase in &settings.success_phrases {
        if page.contains_text(phrase).await.unwrap_or(false) {
            return true;
        }
    }
    false
}
