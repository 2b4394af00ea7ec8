pub mod connection;
pub mod launch;

use chromiumoxide::{Browser, Page};

use crate::config::Config;
use crate::error::AppResult;

pub use connection::connect_to_browser;
pub use launch::launch_browser;

/// 按配置启动浏览器或连接已运行的浏览器
pub async fn open_session(config: &Config) -> AppResult<(Browser, Page)> {
    if config.launch_browser {
        launch_browser(config.headless, config.chrome_executable.as_deref()).await
    } else {
        connect_to_browser(config.browser_debug_port).await
    }
}
