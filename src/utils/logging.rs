use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 订阅器
///
/// 默认级别为 info，可通过 `RUST_LOG` 覆盖。重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n工时提交日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `db_path`: 数据库路径
/// - `mock_mode`: 是否为模拟模式
pub fn log_startup(db_path: &str, mock_mode: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 工时自动提交");
    info!("🗄️ 数据库: {}", db_path);
    if mock_mode {
        info!("🧪 模拟模式: 所有条目提交到本地模拟表单");
    }
    info!("{}", "=".repeat(60));
}

/// 记录待提交条目的分组情况
pub fn log_entries_loaded(total: usize, quarters: usize, unroutable: usize) {
    info!("✓ 找到 {} 条待提交的工时记录", total);
    info!("📋 分布在 {} 个季度表单中", quarters);
    if unroutable > 0 {
        info!("⚠️ {} 条记录不在任何可提交季度内，保持待提交状态", unroutable);
    }
}

/// 打印最终统计信息
///
/// # 参数
/// - `submitted`: 成功数量
/// - `failed`: 失败数量
/// - `unroutable`: 无法路由的数量
/// - `total`: 总数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(
    submitted: usize,
    failed: usize,
    unroutable: usize,
    total: usize,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已提交: {}/{}", submitted, total);
    info!("❌ 失败: {}", failed);
    info!("⏭️ 无法路由: {}", unroutable);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 隐藏邮箱的用户名部分，只保留首字母
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((user, domain)) => {
            let first = user.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}
