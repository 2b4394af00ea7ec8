use std::path::PathBuf;

/// 程序配置
#[derive(Clone)]
pub struct Config {
    /// 浏览器调试端口（连接已运行的浏览器时使用）
    pub browser_debug_port: u16,
    /// 是否自己启动浏览器，而不是连接已运行的浏览器
    pub launch_browser: bool,
    /// 启动浏览器时是否无头
    pub headless: bool,
    /// 浏览器可执行文件路径，为空时由 chromiumoxide 自动查找
    pub chrome_executable: Option<String>,
    /// 登录入口 URL
    pub base_url: String,
    /// SQLite 数据库路径
    pub db_path: String,
    /// 自动化配置文件（TOML），为空时使用内置配置
    pub profile_path: Option<String>,
    /// 待导入的条目文件夹，为空时不导入
    pub import_folder: Option<String>,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否使用指数退避等待（关闭后每次等待只睡一次固定时长）
    pub dynamic_wait: bool,
    /// 某条记录最终失败时是否停止整个运行
    pub stop_on_row_failure: bool,
    /// 模拟模式：所有条目提交到本地模拟表单
    pub mock_mode: bool,
    // --- 登录凭据 ---
    pub login_email: String,
    pub login_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            launch_browser: false,
            headless: false,
            chrome_executable: None,
            base_url: "https://app.smartsheet.com".to_string(),
            db_path: "data/timesheet.db".to_string(),
            profile_path: None,
            import_folder: None,
            output_log_file: "output.txt".to_string(),
            dynamic_wait: true,
            stop_on_row_failure: false,
            mock_mode: false,
            login_email: String::new(),
            login_password: String::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("browser_debug_port", &self.browser_debug_port)
            .field("launch_browser", &self.launch_browser)
            .field("headless", &self.headless)
            .field("base_url", &self.base_url)
            .field("db_path", &self.db_path)
            .field("profile_path", &self.profile_path)
            .field("import_folder", &self.import_folder)
            .field("dynamic_wait", &self.dynamic_wait)
            .field("stop_on_row_failure", &self.stop_on_row_failure)
            .field("mock_mode", &self.mock_mode)
            .field(
                "login_email",
                &crate::utils::logging::redact_email(&self.login_email),
            )
            .field("login_password", &"<redacted>")
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            launch_browser: std::env::var("LAUNCH_BROWSER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.launch_browser),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().filter(|v| !v.is_empty()),
            base_url: std::env::var("BASE_URL").unwrap_or(default.base_url),
            db_path: std::env::var("DB_PATH").unwrap_or(default.db_path),
            profile_path: std::env::var("PROFILE_PATH").ok().filter(|v| !v.is_empty()),
            import_folder: std::env::var("IMPORT_FOLDER").ok().filter(|v| !v.is_empty()),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            dynamic_wait: std::env::var("DYNAMIC_WAIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.dynamic_wait),
            stop_on_row_failure: std::env::var("STOP_ON_ROW_FAILURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.stop_on_row_failure),
            mock_mode: std::env::var("MOCK_MODE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.mock_mode),
            login_email: std::env::var("LOGIN_EMAIL").unwrap_or(default.login_email),
            login_password: std::env::var("LOGIN_PASSWORD").unwrap_or(default.login_password),
        }
    }

    pub fn profile_path_buf(&self) -> Option<PathBuf> {
        self.profile_path.as_ref().map(PathBuf::from)
    }
}
