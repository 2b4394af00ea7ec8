//! 本地存储
//!
//! `Store` 只持有数据库路径，每个操作打开一个短连接；
//! 批量插入的原子性交给 SQLite 事务保证。

pub mod queries;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::TimesheetEntry;

pub use queries::{BatchInsertResult, BatchRowError, DuplicateGroup, InsertResult};

/// 存储句柄
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// 打开（必要时创建）数据库并建表
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::file_read_failed(parent.display().to_string(), e))?;
            }
        }

        let store = Self { path };
        let conn = store.connect()?;
        schema::initialize(&conn)?;
        info!("数据库已就绪: {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 打开一个新连接
    pub fn connect(&self) -> AppResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    pub fn insert_entry(&self, entry: &TimesheetEntry) -> AppResult<InsertResult> {
        queries::insert_entry(&self.connect()?, entry)
    }

    pub fn insert_entries(&self, entries: &[TimesheetEntry]) -> AppResult<BatchInsertResult> {
        let mut conn = self.connect()?;
        queries::insert_entries(&mut conn, entries)
    }

    pub fn check_duplicate_entry(&self, entry: &TimesheetEntry) -> AppResult<bool> {
        queries::check_duplicate_entry(&self.connect()?, entry)
    }

    pub fn duplicate_entries(&self, range: Option<(&str, &str)>) -> AppResult<Vec<DuplicateGroup>> {
        queries::duplicate_entries(&self.connect()?, range)
    }

    pub fn get_entry(&self, id: i64) -> AppResult<Option<TimesheetEntry>> {
        queries::get_entry(&self.connect()?, id)
    }

    pub fn load_pending(&self) -> AppResult<Vec<TimesheetEntry>> {
        queries::load_pending(&self.connect()?)
    }

    pub fn failed_entries(&self) -> AppResult<Vec<TimesheetEntry>> {
        queries::failed_entries(&self.connect()?)
    }

    pub fn submitted_entries(&self) -> AppResult<Vec<TimesheetEntry>> {
        queries::submitted_entries(&self.connect()?)
    }

    pub fn update_entry(&self, id: i64, entry: &TimesheetEntry) -> AppResult<InsertResult> {
        queries::update_entry(&self.connect()?, id, entry)
    }

    pub fn delete_entry(&self, id: i64) -> AppResult<bool> {
        queries::delete_entry(&self.connect()?, id)
    }

    pub fn mark_submitted(&self, id: i64) -> AppResult<()> {
        queries::mark_submitted(&self.connect()?, id)
    }

    pub fn mark_failed(&self, id: i64) -> AppResult<()> {
        queries::mark_failed(&self.connect()?, id)
    }

    pub fn reset_failed_to_pending(&self) -> AppResult<usize> {
        queries::reset_failed_to_pending(&self.connect()?)
    }

    pub fn clear_all(&self) -> AppResult<usize> {
        queries::clear_all(&self.connect()?)
    }
}
