//! 工时记录的读写
//!
//! 重复和约束冲突都以值的形式返回（`InsertResult` / `BatchInsertResult`），
//! 只有数据库本身出错才返回 `Err`。

use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::error::{AppResult, StoreError};
use crate::models::{EntryStatus, TimesheetEntry};

const SELECT_COLUMNS: &str = "SELECT id, date, time_in, time_out, project, tool, detail_charge_code,
        task_description, status, submitted_at FROM timesheet";

/// 单条插入的结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsertResult {
    pub success: bool,
    pub is_duplicate: bool,
    pub changes: usize,
    /// 非重复类约束冲突的描述
    pub error: Option<String>,
}

/// 批量插入中某一行的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRowError {
    pub index: usize,
    pub message: String,
}

/// 批量插入的结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchInsertResult {
    pub success: bool,
    pub total: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: Vec<BatchRowError>,
}

/// 自然键重复的一组记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub date: String,
    pub time_in: i64,
    pub project: String,
    pub task_description: String,
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintKind {
    Unique,
    Other,
}

fn constraint_kind(err: &rusqlite::Error) -> Option<ConstraintKind> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ffi::ErrorCode::ConstraintViolation => {
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE {
                Some(ConstraintKind::Unique)
            } else {
                Some(ConstraintKind::Other)
            }
        }
        _ => None,
    }
}

fn execute_insert(conn: &Connection, entry: &TimesheetEntry) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO timesheet (date, time_in, time_out, project, tool, detail_charge_code, task_description, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.date,
            entry.start_minute,
            entry.end_minute,
            entry.project,
            entry.tool,
            entry.charge_code,
            entry.description,
            EntryStatus::Pending.to_db_str(),
        ],
    )
}

/// 插入一条记录
pub fn insert_entry(conn: &Connection, entry: &TimesheetEntry) -> AppResult<InsertResult> {
    match execute_insert(conn, entry) {
        Ok(changes) => {
            debug!("已插入: {}", entry.label());
            Ok(InsertResult {
                success: true,
                is_duplicate: false,
                changes,
                error: None,
            })
        }
        Err(err) => match constraint_kind(&err) {
            Some(ConstraintKind::Unique) => {
                debug!("重复记录: {}", entry.label());
                Ok(InsertResult {
                    success: false,
                    is_duplicate: true,
                    changes: 0,
                    error: None,
                })
            }
            Some(ConstraintKind::Other) => Ok(InsertResult {
                success: false,
                is_duplicate: false,
                changes: 0,
                error: Some(err.to_string()),
            }),
            None => Err(err.into()),
        },
    }
}

/// 在一个事务中批量插入
///
/// 重复记录跳过并计数；任何其他约束冲突都会回滚整批（inserted = 0）。
pub fn insert_entries(
    conn: &mut Connection,
    entries: &[TimesheetEntry],
) -> AppResult<BatchInsertResult> {
    let total = entries.len();
    let tx = conn.transaction()?;

    let mut inserted = 0;
    let mut duplicates = 0;
    let mut errors = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match execute_insert(&tx, entry) {
            Ok(changes) => inserted += changes,
            Err(err) => match constraint_kind(&err) {
                Some(ConstraintKind::Unique) => duplicates += 1,
                Some(ConstraintKind::Other) => {
                    let violation = StoreError::ConstraintViolation(format!(
                        "第 {} 行 ({}): {}",
                        index + 1,
                        entry.label(),
                        err
                    ));
                    errors.push(BatchRowError {
                        index,
                        message: violation.to_string(),
                    });
                }
                // 事务随 tx drop 回滚
                None => return Err(err.into()),
            },
        }
    }

    if !errors.is_empty() {
        tx.rollback()?;
        warn!("批量插入已回滚: {} 个约束冲突", errors.len());
        return Ok(BatchInsertResult {
            success: false,
            total,
            inserted: 0,
            duplicates,
            errors,
        });
    }

    tx.commit()?;
    info!(
        "批量插入完成: 共 {} 条，新增 {} 条，重复 {} 条",
        total, inserted, duplicates
    );
    Ok(BatchInsertResult {
        success: true,
        total,
        inserted,
        duplicates,
        errors,
    })
}

/// 自然键是否已存在（编辑时排除记录自身）
pub fn check_duplicate_entry(conn: &Connection, entry: &TimesheetEntry) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM timesheet
         WHERE date = ?1 AND time_in = ?2 AND project = ?3 AND task_description = ?4
           AND (?5 IS NULL OR id != ?5)",
        params![
            entry.date,
            entry.start_minute,
            entry.project,
            entry.description,
            entry.id
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// 列出自然键重复的记录组，可按日期范围（含）过滤
///
/// 有唯一索引的库里结果总是为空；用于检查建索引之前遗留的数据。
pub fn duplicate_entries(
    conn: &Connection,
    range: Option<(&str, &str)>,
) -> AppResult<Vec<DuplicateGroup>> {
    let (from, to) = match range {
        Some((from, to)) => (Some(from), Some(to)),
        None => (None, None),
    };
    let mut stmt = conn.prepare(
        "SELECT date, time_in, project, task_description, group_concat(id)
         FROM timesheet
         WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
         GROUP BY date, time_in, project, task_description
         HAVING COUNT(*) > 1
         ORDER BY date, time_in",
    )?;

    let rows = stmt.query_map(params![from, to], |row| {
        let ids: String = row.get(4)?;
        Ok(DuplicateGroup {
            date: row.get(0)?,
            time_in: row.get(1)?,
            project: row.get(2)?,
            task_description: row.get(3)?,
            ids: ids.split(',').filter_map(|s| s.parse().ok()).collect(),
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn map_row(row: &Row) -> rusqlite::Result<TimesheetEntry> {
    let status_str: String = row.get("status")?;
    let status = EntryStatus::from_db_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(StoreError::Corrupt(format!("未知状态: {}", status_str))),
        )
    })?;

    Ok(TimesheetEntry {
        id: row.get("id")?,
        date: row.get("date")?,
        start_minute: row.get("time_in")?,
        end_minute: row.get("time_out")?,
        project: row.get("project")?,
        tool: row.get("tool")?,
        charge_code: row.get("detail_charge_code")?,
        description: row.get("task_description")?,
        status,
        submitted_at: row.get("submitted_at")?,
    })
}

fn query_entries(
    conn: &Connection,
    filter: &str,
    order: &str,
) -> AppResult<Vec<TimesheetEntry>> {
    let sql = format!("{} {} ORDER BY {}", SELECT_COLUMNS, filter, order);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_entry(conn: &Connection, id: i64) -> AppResult<Option<TimesheetEntry>> {
    let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
    let entry = conn.query_row(&sql, [id], map_row).optional()?;
    Ok(entry)
}

/// 下一轮要提交的记录：待提交 + 失败，按日期和开始时间排序
pub fn load_pending(conn: &Connection) -> AppResult<Vec<TimesheetEntry>> {
    query_entries(
        conn,
        "WHERE status IN ('pending', 'failed')",
        "date ASC, time_in ASC",
    )
}

pub fn failed_entries(conn: &Connection) -> AppResult<Vec<TimesheetEntry>> {
    query_entries(conn, "WHERE status = 'failed'", "date ASC, time_in ASC")
}

/// 已提交的归档记录，最近提交的在前
pub fn submitted_entries(conn: &Connection) -> AppResult<Vec<TimesheetEntry>> {
    query_entries(
        conn,
        "WHERE status = 'submitted'",
        "submitted_at DESC, date DESC, time_in DESC",
    )
}

/// 修改未提交的记录，状态重置为待提交
///
/// 修改后与其他记录自然键冲突时按重复处理。
pub fn update_entry(conn: &Connection, id: i64, entry: &TimesheetEntry) -> AppResult<InsertResult> {
    let result = conn.execute(
        "UPDATE timesheet
         SET date = ?1, time_in = ?2, time_out = ?3, project = ?4, tool = ?5,
             detail_charge_code = ?6, task_description = ?7, status = 'pending'
         WHERE id = ?8 AND status != 'submitted'",
        params![
            entry.date,
            entry.start_minute,
            entry.end_minute,
            entry.project,
            entry.tool,
            entry.charge_code,
            entry.description,
            id
        ],
    );

    match result {
        Ok(0) => Err(StoreError::EntryNotFound { id }.into()),
        Ok(changes) => Ok(InsertResult {
            success: true,
            is_duplicate: false,
            changes,
            error: None,
        }),
        Err(err) => match constraint_kind(&err) {
            Some(ConstraintKind::Unique) => Ok(InsertResult {
                success: false,
                is_duplicate: true,
                changes: 0,
                error: None,
            }),
            Some(ConstraintKind::Other) => Ok(InsertResult {
                success: false,
                is_duplicate: false,
                changes: 0,
                error: Some(err.to_string()),
            }),
            None => Err(err.into()),
        },
    }
}

/// 删除未提交的记录；已提交的记录不能删除
pub fn delete_entry(conn: &Connection, id: i64) -> AppResult<bool> {
    let changes = conn.execute(
        "DELETE FROM timesheet WHERE id = ?1 AND status != 'submitted'",
        [id],
    )?;
    Ok(changes > 0)
}

pub fn mark_submitted(conn: &Connection, id: i64) -> AppResult<()> {
    let changes = conn.execute(
        "UPDATE timesheet SET status = 'submitted', submitted_at = datetime('now') WHERE id = ?1",
        [id],
    )?;
    if changes == 0 {
        return Err(StoreError::EntryNotFound { id }.into());
    }
    Ok(())
}

/// 标记为失败；已提交的记录保持不变
pub fn mark_failed(conn: &Connection, id: i64) -> AppResult<()> {
    let changes = conn.execute(
        "UPDATE timesheet SET status = 'failed' WHERE id = ?1 AND status != 'submitted'",
        [id],
    )?;
    if changes == 0 {
        return Err(StoreError::EntryNotFound { id }.into());
    }
    Ok(())
}

pub fn reset_failed_to_pending(conn: &Connection) -> AppResult<usize> {
    let changes = conn.execute(
        "UPDATE timesheet SET status = 'pending' WHERE status = 'failed'",
        [],
    )?;
    Ok(changes)
}

/// 管理员重置：清空所有记录
pub fn clear_all(conn: &Connection) -> AppResult<usize> {
    let changes = conn.execute("DELETE FROM timesheet", [])?;
    warn!("已清空 {} 条工时记录", changes);
    Ok(changes)
}
