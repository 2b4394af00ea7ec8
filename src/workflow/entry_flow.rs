//! 条目提交流程 - 流程层
//!
//! 核心职责：定义"一条工时记录"的完整提交流程
//!
//! 流程顺序：
//! 1. 把记录映射为表单字段值并校验（失败则不重试）
//! 2. 按重试阶梯执行：填写 → 提交 → 确认
//! 3. 返回提交结果，由编排层更新记录状态

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, AutomationError};
use crate::infrastructure::PageDriver;
use crate::models::{AutomationProfile, FieldSpec, TimesheetEntry, TimingSettings};
use crate::services::{BackoffWaiter, FieldFiller, SubmissionMonitor, SubmissionOutcome};
use crate::workflow::entry_ctx::EntryCtx;
use crate::workflow::retry_ladder::{LadderAction, LadderEvent, LadderState};

/// 条目处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// 已确认提交
    Submitted {
        outcome: SubmissionOutcome,
        level: LadderState,
    },
    /// 三级都失败，或数据本身无法提交
    Failed { reason: String },
}

/// 字段及其取值；None 表示记录中没有该字段的值
pub type FormValues = Vec<(FieldSpec, Option<String>)>;

/// 把记录映射为各字段的取值（固定注入值优先）
pub fn form_values(fields: &[FieldSpec], entry: &TimesheetEntry) -> FormValues {
    fields
        .iter()
        .map(|spec| {
            let value = match &spec.inject_value {
                Some(injected) => Some(injected.clone()),
                None => entry_value(&spec.key, entry),
            };
            (spec.clone(), value)
        })
        .collect()
}

fn entry_value(key: &str, entry: &TimesheetEntry) -> Option<String> {
    match key {
        "project" => Some(entry.project.clone()),
        // 表单要求 MM/DD/YYYY；无法解析时保留原值，交给字段规则报错
        "date" => Some(
            NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d")
                .map(|d| d.format("%m/%d/%Y").to_string())
                .unwrap_or_else(|_| entry.date.clone()),
        ),
        "hours" => Some(format!("{:.2}", entry.hours())),
        "tool" => entry.tool.clone(),
        "task_description" => Some(entry.description.clone()),
        "detail_code" => entry.charge_code.clone(),
        _ => None,
    }
}

/// 提交前校验：必填字段要有值，有值的字段要通过规则
pub fn validate_values(values: &FormValues) -> AppResult<()> {
    for (spec, value) in values {
        match value {
            None if spec.optional => {}
            None => {
                return Err(AutomationError::InvalidFieldValue {
                    field: spec.key.clone(),
                    message: format!("{} 没有值", spec.label),
                }
                .into())
            }
            Some(v) if v.trim().is_empty() && spec.optional => {}
            Some(v) => spec.validate(v).map_err(|message| AutomationError::InvalidFieldValue {
                field: spec.key.clone(),
                message,
            })?,
        }
    }
    Ok(())
}

/// 条目提交流程
///
/// - 编排填写、提交和重试阶梯
/// - 不持有任何资源（page）
/// - 只依赖业务能力（services）
pub struct EntryFlow {
    filler: FieldFiller,
    monitor: SubmissionMonitor,
    fields: Vec<FieldSpec>,
    timing: TimingSettings,
}

impl EntryFlow {
    pub fn new(profile: &AutomationProfile, waiter: BackoffWaiter) -> Self {
        Self {
            filler: FieldFiller::new(waiter, profile.timing.clone(), profile.dropdown.clone()),
            monitor: SubmissionMonitor::new(
                waiter,
                profile.submission.clone(),
                profile.timing.clone(),
            ),
            fields: profile.fields.clone(),
            timing: profile.timing.clone(),
        }
    }

    /// 提交一条记录
    ///
    /// 只有配置错误（如字段缺少定位器）返回 `Err`；其余失败都体现在 `ProcessResult` 中。
    pub async fn run<D: PageDriver>(
        &self,
        page: &D,
        entry: &TimesheetEntry,
        ctx: &EntryCtx,
    ) -> AppResult<ProcessResult> {
        info!("{} 📝 开始提交: {}", ctx, entry.label());

        let values = form_values(&self.fields, entry);
        if let Err(e) = validate_values(&values) {
            warn!("{} ⚠️ 数据无法提交: {}", ctx, e);
            return Ok(ProcessResult::Failed {
                reason: e.to_string(),
            });
        }

        let mut state = LadderState::Initial;
        let mut last_reason = String::new();

        loop {
            let delay = state.delay(&self.timing);
            if !delay.is_zero() {
                info!(
                    "{} 🔁 第 {} 级重试，{}ms 后开始",
                    ctx,
                    state.level(),
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let attempt = match state.action() {
                LadderAction::FillAndSubmit | LadderAction::RefillAndSubmit => {
                    match self.fill_all(page, &values, ctx).await {
                        Ok(()) => self.monitor.submit(page).await.map_err(|e| (Phase::Submit, e)),
                        Err(e) => Err((Phase::Fill, e)),
                    }
                }
                LadderAction::ResubmitOnly => {
                    self.monitor.submit(page).await.map_err(|e| (Phase::Submit, e))
                }
                LadderAction::GiveUp => {
                    error!("{} ❌ 三级重试均失败: {}", ctx, last_reason);
                    return Ok(ProcessResult::Failed {
                        reason: last_reason,
                    });
                }
            };

            let event = match attempt {
                Ok(outcome) if outcome.success => {
                    info!("{} ✅ 提交成功 (第 {} 级)", ctx, state.level());
                    return Ok(ProcessResult::Submitted {
                        outcome,
                        level: state,
                    });
                }
                Ok(_) => {
                    last_reason = AutomationError::SubmissionUnverified(
                        "没有匹配的网络响应，也没有成功提示".to_string(),
                    )
                    .to_string();
                    LadderEvent::SubmitUnverified
                }
                Err((phase, e)) => match classify_failure(phase, &e) {
                    Failure::Fatal => return Err(e),
                    Failure::Entry => {
                        error!("{} ❌ 提交失败，不再重试: {}", ctx, e);
                        return Ok(ProcessResult::Failed {
                            reason: e.to_string(),
                        });
                    }
                    Failure::Ladder(event) => {
                        last_reason = e.to_string();
                        event
                    }
                },
            };

            warn!("{} ⚠️ 第 {} 级未成功: {}", ctx, state.level(), last_reason);
            state = state.next(event);
        }
    }

    /// 按配置顺序填写全部字段；可选字段失败只记录警告
    async fn fill_all<D: PageDriver>(
        &self,
        page: &D,
        values: &FormValues,
        ctx: &EntryCtx,
    ) -> AppResult<()> {
        for (spec, value) in values {
            let Some(value) = value.as_deref() else {
                continue;
            };
            if value.trim().is_empty() && spec.optional {
                continue;
            }

            match self.filler.fill_field(page, spec, value).await {
                Ok(_) => {}
                Err(e) if spec.optional && !is_config_error(&e) => {
                    warn!("{} 可选字段 '{}' 填写失败，继续: {}", ctx, spec.label, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fill,
    Submit,
}

enum Failure {
    /// 配置错误，中止整个运行
    Fatal,
    /// 这条记录失败，不再重试
    Entry,
    /// 交给重试阶梯
    Ladder(LadderEvent),
}

fn classify_failure(phase: Phase, err: &AppError) -> Failure {
    match err {
        AppError::Automation(AutomationError::LocatorNotFound { .. }) => Failure::Fatal,
        AppError::Automation(AutomationError::ElementNotVisible { .. }) => {
            Failure::Ladder(LadderEvent::FillTimedOut)
        }
        AppError::Automation(e) if e.is_transient() => {
            Failure::Ladder(LadderEvent::SubmitUnverified)
        }
        // 页面操作本身出错（CDP 调用失败、元素被替换），按所处阶段交给重试阶梯
        AppError::Browser(_) | AppError::Other(_) => match phase {
            Phase::Fill => Failure::Ladder(LadderEvent::FillTimedOut),
            Phase::Submit => Failure::Ladder(LadderEvent::SubmitUnverified),
        },
        _ => Failure::Entry,
    }
}

fn is_config_error(err: &AppError) -> bool {
    matches!(
        err.as_automation(),
        Some(AutomationError::LocatorNotFound { .. })
    )
}
