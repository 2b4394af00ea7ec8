//! 单轮提交处理器 - 编排层
//!
//! ## 职责
//!
//! 1. 从存储中取出待提交记录（pending + failed）
//! 2. 按季度表单分组，不在任何季度内的记录保持待提交
//! 3. 逐条导航到表单、执行 EntryFlow
//! 4. 根据结果更新记录状态，按配置决定失败后是否停止
//!
//! 全程顺序执行：所有记录共用一个页面。

use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::infrastructure::PageDriver;
use crate::models::{QuarterWindow, TimesheetEntry};
use crate::services::QuarterRouter;
use crate::store::Store;
use crate::utils::logging::log_entries_loaded;
use crate::workflow::{EntryCtx, EntryFlow, ProcessResult};

/// 一轮提交的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub submitted: usize,
    pub failed: usize,
    pub unroutable: usize,
    /// 因 stop_on_row_failure 提前结束
    pub stopped_early: bool,
}

/// 按季度分组，保持窗口顺序和组内的日期顺序
pub fn group_by_quarter<'a>(
    router: &'a QuarterRouter,
    entries: Vec<TimesheetEntry>,
) -> (Vec<(&'a QuarterWindow, Vec<TimesheetEntry>)>, Vec<TimesheetEntry>) {
    let mut groups: Vec<(&QuarterWindow, Vec<TimesheetEntry>)> = router
        .windows()
        .iter()
        .map(|w| (w, Vec::new()))
        .collect();
    let mut unroutable = Vec::new();

    for entry in entries {
        match router.quarter_for_date(&entry.date) {
            Some(window) => {
                if let Some((_, group)) = groups.iter_mut().find(|(w, _)| w.id == window.id) {
                    group.push(entry);
                }
            }
            None => unroutable.push(entry),
        }
    }

    groups.retain(|(_, group)| !group.is_empty());
    (groups, unroutable)
}

/// 提交所有待提交记录
///
/// 只有配置错误会返回 `Err`；单条记录的失败记录在统计里。
pub async fn process_pending<D: PageDriver>(
    page: &D,
    store: &Store,
    router: &QuarterRouter,
    flow: &EntryFlow,
    stop_on_row_failure: bool,
) -> AppResult<RunSummary> {
    let entries = store.load_pending()?;
    let (groups, unroutable) = group_by_quarter(router, entries);

    for entry in &unroutable {
        warn!("⏭️ 不在任何可提交季度内，跳过: {}", entry.label());
    }

    let routable: usize = groups.iter().map(|(_, g)| g.len()).sum();
    let mut summary = RunSummary {
        total: routable + unroutable.len(),
        unroutable: unroutable.len(),
        ..Default::default()
    };
    log_entries_loaded(summary.total, groups.len(), summary.unroutable);

    let mut index = 0;
    for (window, group) in &groups {
        info!("\n{}", "─".repeat(60));
        info!("📄 季度表单 {} ({} 条): {}", window.name, group.len(), window.form_url);
        info!("{}", "─".repeat(60));

        for entry in group {
            index += 1;
            let ctx = EntryCtx::new(entry.id, index, routable, window.id.clone());

            let result = match page.goto(&window.form_url).await {
                Ok(()) => flow.run(page, entry, &ctx).await?,
                Err(e) => ProcessResult::Failed {
                    reason: format!("无法打开表单: {}", e),
                },
            };

            match result {
                ProcessResult::Submitted { .. } => {
                    summary.submitted += 1;
                    if let Some(id) = entry.id {
                        store.mark_submitted(id)?;
                    }
                }
                ProcessResult::Failed { reason } => {
                    summary.failed += 1;
                    if let Some(id) = entry.id {
                        store.mark_failed(id)?;
                    }
                    error!("{} ❌ 记录失败: {}", ctx, reason);

                    if stop_on_row_failure {
                        warn!("🛑 已配置失败即停止，结束本轮");
                        summary.stopped_early = true;
                        return Ok(summary);
                    }
                }
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_page::{response, ClickEffect, FakeElement, FakePage};
    use crate::models::{AutomationProfile, EntryStatus};
    use crate::services::BackoffWaiter;

    const SUBMIT: &str = "button[data-client-id='form_submit_btn']";

    fn profile() -> AutomationProfile {
        let mut profile = AutomationProfile::default();
        profile.timing.field_visible_ms = 200;
        profile.timing.option_wait_ms = 200;
        profile.timing.submit_verify_ms = 300;
        profile
    }

    fn form_page(profile: &AutomationProfile) -> FakePage {
        let page = FakePage::new().with_element("[role='option']").with_element(SUBMIT);
        for field in &profile.fields {
            page.add_element(&field.locator, FakeElement::default());
        }
        page
    }

    fn ok_click() -> ClickEffect {
        ClickEffect {
            responses: vec![(
                response("r", "https://forms.smartsheet.com/api/submit/1", 200),
                None,
            )],
            page_text: None,
        }
    }

    fn seeded_store(dir: &tempfile::TempDir) -> Store {
        let store = Store::open(dir.path().join("t.db")).unwrap();
        for e in [
            TimesheetEntry::new("2025-10-02", 540, 600, "P", "Q4 work"),
            TimesheetEntry::new("2025-08-01", 540, 600, "P", "Q3 work"),
            TimesheetEntry::new("2024-01-01", 540, 600, "P", "too old"),
        ] {
            assert!(store.insert_entry(&e).unwrap().success);
        }
        store
    }

    #[test]
    fn test_group_by_quarter() {
        let router = QuarterRouter::new(AutomationProfile::default().quarters).unwrap();
        let entries = vec![
            TimesheetEntry::new("2025-10-02", 540, 600, "P", "a"),
            TimesheetEntry::new("2025-08-01", 540, 600, "P", "b"),
            TimesheetEntry::new("2025-08-02", 540, 600, "P", "c"),
            TimesheetEntry::new("2030-01-01", 540, 600, "P", "d"),
        ];
        let (groups, unroutable) = group_by_quarter(&router, entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.id, "Q3-2025");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0.id, "Q4-2025");
        assert_eq!(unroutable.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_updates_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let profile = profile();
        let router = QuarterRouter::new(profile.quarters.clone()).unwrap();
        let flow = EntryFlow::new(&profile, BackoffWaiter::new(true));
        let page = form_page(&profile);
        page.push_click_effect(ok_click());
        page.push_click_effect(ok_click());

        let summary = process_pending(&page, &store, &router, &flow, false)
            .await
            .unwrap();
        assert_eq!(
            summary,
            RunSummary {
                total: 3,
                submitted: 2,
                failed: 0,
                unroutable: 1,
                stopped_early: false,
            }
        );
        // Q3 表单先于 Q4
        let visited = page.visited.borrow().clone();
        assert_eq!(visited.len(), 2);
        assert_eq!(visited[0], profile.quarters[0].form_url);
        assert_eq!(visited[1], profile.quarters[1].form_url);

        let pending = store.load_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].description, "too old");
        assert_eq!(store.submitted_entries().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_continues_or_stops() {
        let profile = profile();
        let router = QuarterRouter::new(profile.quarters.clone()).unwrap();
        let flow = EntryFlow::new(&profile, BackoffWaiter::new(true));

        // 不停止：两条都失败，都被标记为 failed
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let page = form_page(&profile);
        let summary = process_pending(&page, &store, &router, &flow, false)
            .await
            .unwrap();
        assert_eq!(summary.failed, 2);
        assert!(!summary.stopped_early);
        assert_eq!(store.failed_entries().unwrap().len(), 2);

        // 停止：第一条失败后结束，第二条保持 pending
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let page = form_page(&profile);
        let summary = process_pending(&page, &store, &router, &flow, true)
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.submitted, 0);
        assert!(summary.stopped_early);
        let statuses: Vec<EntryStatus> = store
            .load_pending()
            .unwrap()
            .iter()
            .map(|e| e.status)
            .collect();
        assert_eq!(statuses.iter().filter(|s| **s == EntryStatus::Failed).count(), 1);
        assert_eq!(statuses.iter().filter(|s| **s == EntryStatus::Pending).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_fails_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let profile = profile();
        let router = QuarterRouter::new(profile.quarters.clone()).unwrap();
        let flow = EntryFlow::new(&profile, BackoffWaiter::new(true));
        let page = form_page(&profile);
        page.goto_failures.set(1);
        page.push_click_effect(ok_click());

        let summary = process_pending(&page, &store, &router, &flow, false)
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.submitted, 1);
    }
}
