//! 季度路由 - 业务能力层
//!
//! 把一个日期映射到对应的季度表单。窗口集合由配置维护（当前季度与上一季度），
//! 路由器本身不做任何窗口计算，调用方保证窗口之间不重叠。

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::error::{AppResult, ConfigError};
use crate::models::QuarterWindow;

/// 模拟模式下使用的本地表单
pub const MOCK_FORM_URL: &str = "http://localhost:8080/mock-form";

/// 季度路由器
#[derive(Debug, Clone)]
pub struct QuarterRouter {
    windows: Vec<QuarterWindow>,
}

impl QuarterRouter {
    /// 创建路由器，检查每个窗口的日期合法
    pub fn new(windows: Vec<QuarterWindow>) -> AppResult<Self> {
        for window in &windows {
            let start = parse_iso_date(&window.start_date).ok_or_else(|| {
                ConfigError::InvalidQuarter {
                    id: window.id.clone(),
                    reason: format!("开始日期无效: {}", window.start_date),
                }
            })?;
            let end = parse_iso_date(&window.end_date).ok_or_else(|| {
                ConfigError::InvalidQuarter {
                    id: window.id.clone(),
                    reason: format!("结束日期无效: {}", window.end_date),
                }
            })?;
            if end < start {
                return Err(ConfigError::InvalidQuarter {
                    id: window.id.clone(),
                    reason: "结束日期早于开始日期".to_string(),
                }
                .into());
            }
        }
        Ok(Self { windows })
    }

    /// 模拟模式：一个覆盖所有日期的窗口，指向本地模拟表单
    pub fn mock() -> Self {
        Self {
            windows: vec![QuarterWindow {
                id: "MOCK".to_string(),
                name: "Mock Form".to_string(),
                start_date: "0001-01-01".to_string(),
                end_date: "9999-12-31".to_string(),
                form_url: MOCK_FORM_URL.to_string(),
                form_id: "mock".to_string(),
            }],
        }
    }

    pub fn windows(&self) -> &[QuarterWindow] {
        &self.windows
    }

    /// 找到包含该日期的季度；日期格式错误或不在任何窗口中时返回 None
    pub fn quarter_for_date(&self, date: &str) -> Option<&QuarterWindow> {
        let day = parse_iso_date(date)?;
        let found = self.windows.iter().find(|w| {
            match (parse_iso_date(&w.start_date), parse_iso_date(&w.end_date)) {
                (Some(start), Some(end)) => start <= day && day <= end,
                _ => false,
            }
        });
        debug!(date, quarter = ?found.map(|w| w.id.as_str()), "季度路由");
        found
    }

    /// 检查日期是否可提交，失败时返回给用户看的提示
    pub fn validate_quarter_availability(&self, date: &str) -> Result<&QuarterWindow, String> {
        if date.trim().is_empty() {
            return Err("请输入日期".to_string());
        }
        if parse_iso_date(date).is_none() {
            return Err(format!("日期格式无效: '{}'，应为 YYYY-MM-DD", date));
        }
        self.quarter_for_date(date).ok_or_else(|| {
            let ranges = self
                .windows
                .iter()
                .map(|w| format!("{} ({} ~ {})", w.name, w.start_date, w.end_date))
                .collect::<Vec<_>>()
                .join(", ");
            format!("日期 {} 不在可提交的季度内。可用季度: {}", date, ranges)
        })
    }

    pub fn quarter_by_id(&self, id: &str) -> Option<&QuarterWindow> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn available_quarter_ids(&self) -> Vec<&str> {
        self.windows.iter().map(|w| w.id.as_str()).collect()
    }

    /// 今天所在的季度
    pub fn current_quarter(&self) -> Option<&QuarterWindow> {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        self.quarter_for_date(&today)
    }
}

/// 严格解析 YYYY-MM-DD：长度必须为 10，月和日必须补零，且是真实存在的日期
pub fn parse_iso_date(date: &str) -> Option<NaiveDate> {
    let bytes = date.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
