//! 条目处理上下文
//!
//! 封装"我正在提交第几条记录、提交到哪个季度表单"这一信息

use std::fmt::Display;

/// 条目处理上下文
#[derive(Debug, Clone)]
pub struct EntryCtx {
    /// 数据库中的记录 ID
    pub entry_id: Option<i64>,

    /// 本轮中的序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本轮总条数
    pub total: usize,

    /// 目标季度
    pub quarter_id: String,
}

impl EntryCtx {
    pub fn new(entry_id: Option<i64>, index: usize, total: usize, quarter_id: String) -> Self {
        Self {
            entry_id,
            index,
            total,
            quarter_id,
        }
    }
}

impl Display for EntryCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.entry_id {
            Some(id) => write!(
                f,
                "[条目 {}/{} ID#{} 季度#{}]",
                self.index, self.total, id, self.quarter_id
            ),
            None => write!(
                f,
                "[条目 {}/{} 季度#{}]",
                self.index, self.total, self.quarter_id
            ),
        }
    }
}
