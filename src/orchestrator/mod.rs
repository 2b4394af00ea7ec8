//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一轮提交的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用主结构
//! - 管理应用生命周期（初始化、登录、运行）
//! - 管理浏览器资源（Browser、CdpPage）
//! - 输出本轮统计信息
//!
//! ### `run_processor` - 单轮提交处理器
//! - 加载待提交记录并按季度分组
//! - 逐条执行 EntryFlow
//! - 更新记录状态，处理"失败即停止"
//!
//! ### `importer` - 条目导入
//! - 把 TOML 条目文件按文件批量写入存储
//!
//! ## 层次关系
//!
//! ```text
//! app (会话 + 登录)
//!     ↓
//! run_processor (处理 Vec<TimesheetEntry>)
//!     ↓
//! workflow::EntryFlow (处理单条记录 + 重试阶梯)
//!     ↓
//! services (能力层：backoff / field_filler / submission_monitor / quarter_router / login)
//!     ↓
//! infrastructure (基础设施：PageDriver / JsExecutor / 响应观察器)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有 Browser
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度、状态更新和统计
//! 4. **顺序执行**：所有记录共用一个页面，不并发

pub mod app;
pub mod importer;
pub mod run_processor;

// 重新导出主要类型
pub use app::App;
pub use importer::{import_folder, ImportSummary};
pub use run_processor::{group_by_quarter, process_pending, RunSummary};
