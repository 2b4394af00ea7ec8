use serde::{Deserialize, Serialize};
use std::fmt;

use crate::services::quarter_router::parse_iso_date;

/// 一天的分钟数
pub const MINUTES_PER_DAY: i64 = 1440;
/// 时间粒度（分钟）
pub const SLOT_MINUTES: i64 = 15;

/// 条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// 待提交
    Pending,
    /// 已提交
    Submitted,
    /// 提交失败（仍可再次提交）
    Failed,
}

impl EntryStatus {
    pub fn to_db_str(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Submitted => "submitted",
            EntryStatus::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EntryStatus::Pending),
            "submitted" => Some(EntryStatus::Submitted),
            "failed" => Some(EntryStatus::Failed),
            _ => None,
        }
    }

    /// 是否还会被下一轮提交拾取
    pub fn is_eligible(self) -> bool {
        !matches!(self, EntryStatus::Submitted)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// 工时条目
///
/// 自然键为 (date, start_minute, project, description)。
/// 工时 `hours()` 永远由起止分钟推导，不单独存储可编辑的值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesheetEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// YYYY-MM-DD
    pub date: String,
    #[serde(rename = "time_in", deserialize_with = "deserialize_minutes")]
    pub start_minute: i64,
    #[serde(rename = "time_out", deserialize_with = "deserialize_minutes")]
    pub end_minute: i64,
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_code: Option<String>,
    pub description: String,
    #[serde(default = "default_status")]
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

fn default_status() -> EntryStatus {
    EntryStatus::Pending
}

impl TimesheetEntry {
    /// 创建新的待提交条目
    pub fn new(
        date: impl Into<String>,
        start_minute: i64,
        end_minute: i64,
        project: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            date: date.into(),
            start_minute,
            end_minute,
            project: project.into(),
            tool: None,
            charge_code: None,
            description: description.into(),
            status: EntryStatus::Pending,
            submitted_at: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_charge_code(mut self, code: impl Into<String>) -> Self {
        self.charge_code = Some(code.into());
        self
    }

    /// 推导工时
    pub fn hours(&self) -> f64 {
        (self.end_minute - self.start_minute) as f64 / 60.0
    }

    /// 检查时间区间是否合法
    ///
    /// 存储层也有同样的 CHECK 约束，这里用于导入前给出可读的错误。
    pub fn validate(&self) -> Result<(), String> {
        if self.date.trim().is_empty() {
            return Err("日期不能为空".to_string());
        }
        if parse_iso_date(&self.date).is_none() {
            return Err(format!("日期格式无效，应为 YYYY-MM-DD: {}", self.date));
        }
        if self.project.trim().is_empty() {
            return Err("项目不能为空".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("任务描述不能为空".to_string());
        }
        validate_range(self.start_minute, self.end_minute)
    }

    /// 用于日志显示的简短标签
    pub fn label(&self) -> String {
        format!(
            "{} {}-{} {}",
            self.date,
            format_minutes(self.start_minute),
            format_minutes(self.end_minute),
            self.project
        )
    }
}

/// 校验起止分钟：0 <= start < end <= 1440，且均为 15 的倍数
pub fn validate_range(start_minute: i64, end_minute: i64) -> Result<(), String> {
    if start_minute < 0 || end_minute > MINUTES_PER_DAY {
        return Err(format!(
            "时间必须在 00:00 与 24:00 之间: {}-{}",
            start_minute, end_minute
        ));
    }
    if start_minute % SLOT_MINUTES != 0 || end_minute % SLOT_MINUTES != 0 {
        return Err("时间必须是 15 分钟的整数倍".to_string());
    }
    if end_minute <= start_minute {
        return Err("结束时间必须晚于开始时间".to_string());
    }
    Ok(())
}

/// 把 "HH:MM" 解析为当天的分钟数
pub fn parse_time_to_minutes(time_str: &str) -> Result<i64, String> {
    let (h, m) = time_str
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("无效的时间格式: {}", time_str))?;

    let hours: i64 = h
        .parse()
        .map_err(|_| format!("无效的小时: {}", h))?;
    let minutes: i64 = m
        .parse()
        .map_err(|_| format!("无效的分钟: {}", m))?;

    // 24:00 允许作为一天的结束
    if hours == 24 && minutes == 0 {
        return Ok(MINUTES_PER_DAY);
    }
    if !(0..=23).contains(&hours) {
        return Err(format!("小时必须在 0-23 之间: {}", hours));
    }
    if !(0..=59).contains(&minutes) {
        return Err(format!("分钟必须在 0-59 之间: {}", minutes));
    }

    Ok(hours * 60 + minutes)
}

/// 把分钟数格式化为 "HH:MM"
pub fn format_minutes(minutes: i64) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

// 时间既可以写成 "09:00" 也可以直接写分钟数 540
fn deserialize_minutes<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;

    struct MinutesVisitor;

    impl<'de> Visitor<'de> for MinutesVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a HH:MM string or an integer number of minutes")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_time_to_minutes(value).map_err(E::custom)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            i64::try_from(value).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(MinutesVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_to_minutes() {
        assert_eq!(parse_time_to_minutes("09:00").unwrap(), 540);
        assert_eq!(parse_time_to_minutes("9:15").unwrap(), 555);
        assert_eq!(parse_time_to_minutes("24:00").unwrap(), 1440);
        assert!(parse_time_to_minutes("24:15").is_err());
        assert!(parse_time_to_minutes("12:60").is_err());
        assert!(parse_time_to_minutes("1200").is_err());
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(540), "09:00");
        assert_eq!(format_minutes(1440), "24:00");
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(540, 600).is_ok());
        assert!(validate_range(0, 1440).is_ok());
        assert!(validate_range(541, 600).is_err());
        assert!(validate_range(600, 600).is_err());
        assert!(validate_range(600, 540).is_err());
        assert!(validate_range(-15, 0).is_err());
        assert!(validate_range(1425, 1455).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_rows() {
        assert!(TimesheetEntry::new("2025-08-01", 540, 600, "P", "T").validate().is_ok());
        assert!(TimesheetEntry::new("2025-8-1", 540, 600, "P", "T").validate().is_err());
        assert!(TimesheetEntry::new("2025-02-30", 540, 600, "P", "T").validate().is_err());
        assert!(TimesheetEntry::new("2025-08-01", 540, 600, " ", "T").validate().is_err());
        assert!(TimesheetEntry::new("2025-08-01", 540, 600, "P", "").validate().is_err());
    }

    #[test]
    fn test_hours_is_derived() {
        let e = TimesheetEntry::new("2025-01-15", 540, 645, "P", "T");
        assert_eq!(e.hours(), 1.75);
    }

    #[test]
    fn test_deserialize_mixed_time_formats() {
        let toml_str = r#"
            date = "2025-01-15"
            time_in = "09:00"
            time_out = 600
            project = "P"
            description = "T"
        "#;
        let e: TimesheetEntry = toml::from_str(toml_str).unwrap();
        assert_eq!(e.start_minute, 540);
        assert_eq!(e.end_minute, 600);
        assert_eq!(e.status, EntryStatus::Pending);
    }

    #[test]
    fn test_status_round_trip_strings() {
        for s in [EntryStatus::Pending, EntryStatus::Submitted, EntryStatus::Failed] {
            assert_eq!(EntryStatus::from_db_str(s.to_db_str()), Some(s));
        }
        assert!(!EntryStatus::Submitted.is_eligible());
        assert!(EntryStatus::Failed.is_eligible());
    }
}
