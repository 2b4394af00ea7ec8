use serde::{Deserialize, Serialize};

/// 季度窗口：把某个日期区间路由到对应的表单实例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterWindow {
    /// 季度标识（如 'Q3-2025'）
    pub id: String,
    /// 人类可读的季度名
    pub name: String,
    /// 开始日期 YYYY-MM-DD（含）
    pub start_date: String,
    /// 结束日期 YYYY-MM-DD（含）
    pub end_date: String,
    /// 表单 URL
    pub form_url: String,
    /// 表单 ID
    pub form_id: String,
}

impl QuarterWindow {
    pub fn new(
        id: &str,
        name: &str,
        start_date: &str,
        end_date: &str,
        form_id: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            form_url: format!("https://app.smartsheet.com/b/form/{}", form_id),
            form_id: form_id.to_string(),
        }
    }
}
