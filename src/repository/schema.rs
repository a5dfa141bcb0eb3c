// ==========================================
// 移动设备返修录入系统 - 数据库建表
// ==========================================
// 表: rma_submissions / rma_devices / sync_retry_queue
// 约定: 时间列一律 RFC3339 文本; 枚举列以 CHECK 约束锁定取值
// ==========================================

use rusqlite::Connection;

/// 建表 DDL(幂等,IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS rma_submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_number TEXT NOT NULL UNIQUE,
    company_name TEXT NOT NULL,
    company_email TEXT NOT NULL,
    order_number TEXT,
    customer_type TEXT NOT NULL DEFAULT 'us'
        CHECK (customer_type IN ('us', 'international')),
    overall_status TEXT NOT NULL DEFAULT 'PENDING',
    total_devices INTEGER NOT NULL DEFAULT 0,
    pending_count INTEGER NOT NULL DEFAULT 0,
    approved_count INTEGER NOT NULL DEFAULT 0,
    denied_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rma_devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    submission_id INTEGER NOT NULL
        REFERENCES rma_submissions(id) ON DELETE CASCADE,
    imei TEXT NOT NULL,
    imei_raw TEXT,
    imei_valid INTEGER NOT NULL DEFAULT 1,
    validation_errors TEXT,
    validation_warnings TEXT,
    model TEXT,
    storage TEXT,
    condition TEXT,
    issue_description TEXT,
    issue_category TEXT,
    requested_action TEXT,
    unit_price REAL,
    repair_cost REAL,
    approval_status TEXT NOT NULL DEFAULT 'PENDING'
        CHECK (approval_status IN (
            'PENDING', 'UNDER_REVIEW', 'INFO_REQUESTED',
            'APPROVED', 'DENIED', 'SYNCED'
        )),
    is_duplicate INTEGER NOT NULL DEFAULT 0,
    duplicate_override INTEGER NOT NULL DEFAULT 0,
    duplicate_override_reason TEXT,
    synced INTEGER NOT NULL DEFAULT 0,
    synced_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rma_devices_imei ON rma_devices(imei);
CREATE INDEX IF NOT EXISTS idx_rma_devices_submission ON rma_devices(submission_id);
CREATE INDEX IF NOT EXISTS idx_rma_devices_status ON rma_devices(approval_status);

CREATE TABLE IF NOT EXISTS sync_retry_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL
        REFERENCES rma_devices(id) ON DELETE CASCADE,
    submission_id INTEGER NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 5,
    next_retry_at TEXT,
    error_message TEXT,
    last_error_at TEXT,
    payload TEXT,
    status TEXT NOT NULL DEFAULT 'QUEUED'
        CHECK (status IN ('QUEUED', 'RETRYING', 'FAILED', 'SUCCESS')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sync_retry_queue_due
    ON sync_retry_queue(status, next_retry_at);
"#;

/// 初始化建表(幂等,可在已建库的连接上重复执行)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_connection;

    #[test]
    fn test_schema_creates_all_tables() {
        let conn = open_in_memory_connection().unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('rma_submissions', 'rma_devices', 'sync_retry_queue')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = open_in_memory_connection().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn test_approval_status_check_constraint() {
        let conn = open_in_memory_connection().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO rma_submissions
             (reference_number, company_name, company_email, created_at, updated_at)
             VALUES ('RMA-TEST', 'ACME', 'a@b.c', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO rma_devices
             (submission_id, imei, approval_status, created_at, updated_at)
             VALUES (1, '351454482579210', 'BOGUS', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
