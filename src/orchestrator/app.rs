//! 应用主结构 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、浏览器会话、季度路由
//! 2. **登录**：按配置的步骤表登录（模拟模式跳过）
//! 3. **提交**：委托 run_processor 处理所有待提交记录
//! 4. **统计**：输出本轮结果
//!
//! App 是唯一持有 Browser 的结构。

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::CdpPage;
use crate::models::AutomationProfile;
use crate::orchestrator::run_processor::{process_pending, RunSummary};
use crate::services::{BackoffWaiter, Credentials, LoginFlow, QuarterRouter};
use crate::store::Store;
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};
use crate::workflow::EntryFlow;

/// 应用主结构
pub struct App {
    config: Config,
    profile: AutomationProfile,
    store: Store,
    router: QuarterRouter,
    waiter: BackoffWaiter,
    _browser: Browser,
    page: CdpPage,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config, profile: AutomationProfile, store: Store) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config.db_path, config.mock_mode);

        let router = if config.mock_mode {
            QuarterRouter::mock()
        } else {
            QuarterRouter::new(profile.quarters.clone())?
        };
        match router.current_quarter() {
            Some(q) => info!("📅 当前季度: {}", q.name),
            None => warn!("⚠️ 今天不在任何已配置的季度内，季度表可能需要更新"),
        }

        let (browser, page) = browser::open_session(&config)
            .await
            .context("无法打开浏览器会话")?;
        let page = CdpPage::new(page).with_navigation_timeout(std::time::Duration::from_millis(
            profile.timing.navigation_ms,
        ));

        Ok(Self {
            waiter: BackoffWaiter::new(config.dynamic_wait),
            config,
            profile,
            store,
            router,
            _browser: browser,
            page,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        if self.config.mock_mode {
            info!("🧪 模拟模式，跳过登录");
        } else {
            let credentials =
                Credentials::new(&self.config.login_email, &self.config.login_password);
            LoginFlow::new(
                self.waiter,
                self.profile.timing.clone(),
                self.profile.login_steps.clone(),
                &self.config.base_url,
            )
            .run(&self.page, &credentials)
            .await
            .context("登录失败")?;
        }

        let flow = EntryFlow::new(&self.profile, self.waiter);
        let summary = process_pending(
            &self.page,
            &self.store,
            &self.router,
            &flow,
            self.config.stop_on_row_failure,
        )
        .await?;

        if summary.stopped_early {
            warn!("🛑 本轮因记录失败提前结束");
        }
        print_final_stats(
            summary.submitted,
            summary.failed,
            summary.unroutable,
            summary.total,
            &self.config.output_log_file,
        );

        Ok(summary)
    }
}
