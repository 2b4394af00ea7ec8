//! # Sheetpilot
//!
//! 把本地工时记录自动提交到供应商托管的网页表单，并维护一个去重的本地待提交队列
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构，外加一个存储层：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `PageDriver` - 页面操作接口，`CdpPage` 为 chromiumoxide 实现
//! - `CdpResponseObserver` - 作用域内的网络响应订阅
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个字段 / 单次提交
//! - `BackoffWaiter` - 指数退避等待（唯一的挂起点）
//! - `FieldFiller` - 单个字段的填写
//! - `SubmissionMonitor` - 点击提交并通过网络 / 页面双通道确认
//! - `QuarterRouter` - 日期到季度表单的路由
//! - `LoginFlow` - 按步骤表登录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条记录"的完整提交流程
//! - `EntryCtx` - 上下文封装（记录 ID + 季度）
//! - `EntryFlow` - 流程编排（校验 → 填写 → 提交 → 重试阶梯）
//! - `LadderState` - 三级重试阶梯的状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用主结构，管理浏览器和登录
//! - `orchestrator/run_processor` - 单轮处理器，遍历待提交记录并更新状态
//!
//! ### 存储层（Store）
//! - `store/` - SQLite 存储，自然键唯一、工时为生成列、批量插入原子化
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CdpPage, JsExecutor, PageDriver};
pub use models::{AutomationProfile, QuarterWindow, TimesheetEntry};
pub use orchestrator::{import_folder, App, RunSummary};
pub use services::{BackoffWaiter, QuarterRouter};
pub use store::Store;
pub use workflow::{EntryCtx, EntryFlow, ProcessResult};
