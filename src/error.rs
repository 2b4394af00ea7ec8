use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 页面自动化错误（填表、提交、登录）
    #[error("自动化错误: {0}")]
    Automation(#[from] AutomationError),
    /// 本地存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
}

/// 页面自动化错误
///
/// 结构性错误（定位器缺失）直接向上传播；时序错误交给重试阶梯处理；
/// 下拉框提交失败立即失败，不能静默丢失选择。
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 字段没有配置定位器（配置错误，致命）
    #[error("字段 '{field}' 没有配置定位器")]
    LocatorNotFound { field: String },
    /// 等待元素可见超时
    #[error("字段 '{field}' 在 {waited_ms}ms 内不可见 (定位器: {locator})")]
    ElementNotVisible {
        field: String,
        locator: String,
        waited_ms: u64,
    },
    /// 下拉框确认按键发送失败
    #[error("字段 '{field}' 下拉框确认失败: {reason}")]
    DropdownCommitFailed { field: String, reason: String },
    /// 字段值未通过校验规则
    #[error("字段 '{field}' 的值无效: {message}")]
    InvalidFieldValue { field: String, message: String },
    /// 没有找到可点击的提交按钮
    #[error("未找到可用的提交按钮 (已尝试 {tried} 个选择器)")]
    SubmitControlNotFound { tried: usize },
    /// 提交后未能确认成功
    #[error("提交未被确认: {0}")]
    SubmissionUnverified(String),
    /// 必需的登录步骤超时
    #[error("登录步骤 '{step}' 超时")]
    LoginStepTimeout { step: String },
    /// 登录步骤配置有误
    #[error("登录步骤 '{step}' 配置错误: {reason}")]
    LoginStepInvalid { step: String, reason: String },
}

impl AutomationError {
    /// 是否属于可由重试阶梯处理的时序类错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AutomationError::ElementNotVisible { .. }
                | AutomationError::SubmitControlNotFound { .. }
                | AutomationError::SubmissionUnverified(_)
        )
    }
}

/// 本地存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite 调用失败
    #[error("数据库错误: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// 违反约束（非重复类），会中止整批插入
    #[error("违反约束: {0}")]
    ConstraintViolation(String),
    /// 记录不存在
    #[error("记录 {id} 不存在")]
    EntryNotFound { id: i64 },
    /// 数据库中的数据无法解析
    #[error("数据库中存在无法解析的值: {0}")]
    Corrupt(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 季度窗口定义无效
    #[error("季度 '{id}' 定义无效: {reason}")]
    InvalidQuarter { id: String, reason: String },
    /// 自动化配置无效
    #[error("自动化配置无效: {0}")]
    InvalidProfile(String),
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Store(StoreError::Sqlite(err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 取出自动化错误（若是）
    pub fn as_automation(&self) -> Option<&AutomationError> {
        match self {
            AppError::Automation(e) => Some(e),
            _ => None,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
