//! 数据库结构
//!
//! 约束都放在存储边界上：时间对齐与顺序、日期格式和必填文本由 CHECK 保证，
//! 自然键由唯一索引保证，工时是生成列，不能单独修改。

use rusqlite::Connection;

use crate::error::AppResult;

pub const TABLE: &str = "timesheet";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS timesheet (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    date                TEXT    NOT NULL,
    time_in             INTEGER NOT NULL,
    time_out            INTEGER NOT NULL,
    hours               REAL GENERATED ALWAYS AS ((time_out - time_in) / 60.0) STORED,
    project             TEXT    NOT NULL,
    tool                TEXT,
    detail_charge_code  TEXT,
    task_description    TEXT    NOT NULL,
    status              TEXT    NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'submitted', 'failed')),
    submitted_at        TEXT,
    created_at          TEXT    NOT NULL DEFAULT (datetime('now')),
    CHECK (time_in >= 0 AND time_out <= 1440),
    CHECK (time_in % 15 = 0 AND time_out % 15 = 0),
    CHECK (time_out > time_in),
    CHECK (date GLOB '[0-9][0-9][0-9][0-9]-[0-1][0-9]-[0-3][0-9]'),
    CHECK (length(trim(project)) > 0 AND length(trim(task_description)) > 0)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_timesheet_natural_key
    ON timesheet (date, time_in, project, task_description);
CREATE INDEX IF NOT EXISTS idx_timesheet_date ON timesheet (date);
CREATE INDEX IF NOT EXISTS idx_timesheet_project ON timesheet (project);
";

/// 创建表和索引（幂等）
pub fn initialize(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 AND name LIKE 'idx_%'",
                [TABLE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 3);
    }

    #[test]
    fn test_hours_column_cannot_be_written() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO timesheet (date, time_in, time_out, hours, project, task_description)
             VALUES ('2025-01-15', 540, 600, 9.0, 'P', 'T')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_date_and_blank_text_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let insert = |date: &str, project: &str, task: &str| {
            conn.execute(
                "INSERT INTO timesheet (date, time_in, time_out, project, task_description)
                 VALUES (?1, 540, 600, ?2, ?3)",
                [date, project, task],
            )
        };

        assert!(insert("2025-8-1", "P", "T").is_err());
        assert!(insert("2025-08-01", "", "T").is_err());
        assert!(insert("2025-08-01", "P", "  ").is_err());
        assert!(insert("2025-08-01", "P", "T").is_ok());
    }
}
