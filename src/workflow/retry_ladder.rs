//! 重试阶梯
//!
//! 每条记录固定三级：
//! - Initial: 填写全部字段并提交
//! - QuickRetry: 短暂等待后只重新点击提交（不重填）
//! - FullRefill: 较长等待后重新填写全部字段再提交
//!
//! 三级都未确认则进入 Failed。状态转移全部写在 `TRANSITIONS` 表里。

use std::time::Duration;

use crate::models::TimingSettings;

/// 阶梯状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LadderState {
    Initial,
    QuickRetry,
    FullRefill,
    Failed,
}

/// 一次尝试失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LadderEvent {
    /// 提交了但没有确认成功（或找不到提交按钮）
    SubmitUnverified,
    /// 填写阶段等待元素超时，表单状态未知
    FillTimedOut,
}

/// 每个状态要做的事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderAction {
    FillAndSubmit,
    ResubmitOnly,
    RefillAndSubmit,
    GiveUp,
}

/// 失败时的状态转移表: (当前状态, 事件) -> 下一状态
pub const TRANSITIONS: &[(LadderState, LadderEvent, LadderState)] = &[
    (LadderState::Initial, LadderEvent::SubmitUnverified, LadderState::QuickRetry),
    // 填写没完成时只重点提交没有意义，直接重填
    (LadderState::Initial, LadderEvent::FillTimedOut, LadderState::FullRefill),
    (LadderState::QuickRetry, LadderEvent::SubmitUnverified, LadderState::FullRefill),
    (LadderState::QuickRetry, LadderEvent::FillTimedOut, LadderState::FullRefill),
    (LadderState::FullRefill, LadderEvent::SubmitUnverified, LadderState::Failed),
    (LadderState::FullRefill, LadderEvent::FillTimedOut, LadderState::Failed),
];

impl LadderState {
    /// 失败后的下一状态；表中没有的组合一律进入 Failed
    pub fn next(self, event: LadderEvent) -> LadderState {
        TRANSITIONS
            .iter()
            .find(|(from, ev, _)| *from == self && *ev == event)
            .map(|(_, _, to)| *to)
            .unwrap_or(LadderState::Failed)
    }

    pub fn action(self) -> LadderAction {
        match self {
            LadderState::Initial => LadderAction::FillAndSubmit,
            LadderState::QuickRetry => LadderAction::ResubmitOnly,
            LadderState::FullRefill => LadderAction::RefillAndSubmit,
            LadderState::Failed => LadderAction::GiveUp,
        }
    }

    /// 进入该级之前的固定等待
    pub fn delay(self, timing: &TimingSettings) -> Duration {
        match self {
            LadderState::QuickRetry => Duration::from_millis(timing.quick_retry_delay_ms),
            LadderState::FullRefill => Duration::from_millis(timing.full_refill_delay_ms),
            LadderState::Initial | LadderState::Failed => Duration::ZERO,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            LadderState::Initial => 0,
            LadderState::QuickRetry => 1,
            LadderState::FullRefill => 2,
            LadderState::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == LadderState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unverified_walks_all_levels() {
        let mut state = LadderState::Initial;
        let mut visited = vec![state];
        while !state.is_terminal() {
            state = state.next(LadderEvent::SubmitUnverified);
            visited.push(state);
        }
        assert_eq!(
            visited,
            vec![
                LadderState::Initial,
                LadderState::QuickRetry,
                LadderState::FullRefill,
                LadderState::Failed
            ]
        );
    }

    #[test]
    fn test_fill_timeout_skips_quick_retry() {
        assert_eq!(
            LadderState::Initial.next(LadderEvent::FillTimedOut),
            LadderState::FullRefill
        );
        assert_eq!(
            LadderState::FullRefill.next(LadderEvent::FillTimedOut),
            LadderState::Failed
        );
    }

    #[test]
    fn test_failed_is_absorbing() {
        for event in [LadderEvent::SubmitUnverified, LadderEvent::FillTimedOut] {
            assert_eq!(LadderState::Failed.next(event), LadderState::Failed);
        }
        assert_eq!(LadderState::Failed.action(), LadderAction::GiveUp);
    }

    #[test]
    fn test_every_non_terminal_state_has_transitions() {
        for state in [
            LadderState::Initial,
            LadderState::QuickRetry,
            LadderState::FullRefill,
        ] {
            for event in [LadderEvent::SubmitUnverified, LadderEvent::FillTimedOut] {
                assert!(TRANSITIONS
                    .iter()
                    .any(|(from, ev, _)| *from == state && *ev == event));
                // 级别只升不降
                assert!(state.next(event).level() > state.level());
            }
        }
    }

    #[test]
    fn test_delays() {
        let timing = TimingSettings::default();
        assert_eq!(LadderState::Initial.delay(&timing), Duration::ZERO);
        assert_eq!(
            LadderState::QuickRetry.delay(&timing),
            Duration::from_millis(1_000)
        );
        assert_eq!(
            LadderState::FullRefill.delay(&timing),
            Duration::from_millis(3_000)
        );
        assert!(LadderState::QuickRetry.delay(&timing) < LadderState::FullRefill.delay(&timing));
    }
}
