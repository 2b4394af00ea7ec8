use serde::{Deserialize, Serialize};

/// 登录动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginAction {
    Wait,
    Input,
    Click,
}

/// 登录步骤定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginStep {
    pub name: String,
    pub action: LoginAction,
    pub locator: String,
    /// 输入步骤取值的键（email / password）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_key: Option<String>,
    #[serde(default)]
    pub expects_navigation: bool,
    #[serde(default)]
    pub optional: bool,
    /// 敏感值不能出现在日志中
    #[serde(default)]
    pub sensitive: bool,
}

impl LoginStep {
    pub fn wait(name: &str, locator: &str, optional: bool) -> Self {
        Self {
            name: name.to_string(),
            action: LoginAction::Wait,
            locator: locator.to_string(),
            value_key: None,
            expects_navigation: false,
            optional,
            sensitive: false,
        }
    }

    pub fn input(name: &str, locator: &str, value_key: &str) -> Self {
        Self {
            name: name.to_string(),
            action: LoginAction::Input,
            locator: locator.to_string(),
            value_key: Some(value_key.to_string()),
            expects_navigation: false,
            optional: false,
            sensitive: true,
        }
    }

    pub fn click(name: &str, locator: &str, optional: bool) -> Self {
        Self {
            name: name.to_string(),
            action: LoginAction::Click,
            locator: locator.to_string(),
            value_key: None,
            expects_navigation: true,
            optional,
            sensitive: false,
        }
    }
}
