// ==========================================
// 移动设备返修录入系统 - 提交批次仓储
// ==========================================
// 红线: Repository 不含业务逻辑; 计数字段只经 recompute_counters 重算
// ==========================================

use crate::clock::SharedClock;
use crate::domain::submission::{CustomerType, NewSubmission, Submission};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::parse_utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// SubmissionRepository - 提交批次仓储
// ==========================================
pub struct SubmissionRepository {
    conn: Arc<Mutex<Connection>>,
    clock: SharedClock,
}

impl SubmissionRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>, clock: SharedClock) -> Self {
        Self { conn, clock }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建提交批次(生成对外引用号 RMA-XXXXXXXX)
    pub fn create(&self, new: &NewSubmission) -> RepositoryResult<Submission> {
        let conn = self.get_conn()?;
        let now = self.clock.now().to_rfc3339();
        let reference = generate_reference_number();

        conn.execute(
            r#"
            INSERT INTO rma_submissions
                (reference_number, company_name, company_email, order_number,
                 customer_type, overall_status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 'PENDING', ?6, ?6)
            "#,
            params![
                reference,
                new.company_name,
                new.company_email,
                new.order_number,
                new.customer_type.as_str(),
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::info!(submission_id = id, reference = %reference, "提交批次已创建");

        Self::find_by_id_on(&conn, id)?.ok_or(RepositoryError::NotFound {
            entity: "Submission".to_string(),
            id: id.to_string(),
        })
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Submission>> {
        let conn = self.get_conn()?;
        Self::find_by_id_on(&conn, id)
    }

    pub fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<Submission>> {
        let conn = self.get_conn()?;
        let submission = conn
            .query_row(
                &format!("{} WHERE reference_number = ?1", SELECT_SUBMISSION),
                params![reference],
                map_submission,
            )
            .optional()?;
        Ok(submission)
    }

    /// 重算聚合计数(在调用方事务内执行)
    ///
    /// 口径: pending = PENDING/UNDER_REVIEW/INFO_REQUESTED,
    ///       approved = APPROVED/SYNCED, denied = DENIED
    pub fn recompute_counters_on(
        conn: &Connection,
        submission_id: i64,
        now_rfc3339: &str,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE rma_submissions SET
                total_devices = (
                    SELECT COUNT(*) FROM rma_devices WHERE submission_id = ?1
                ),
                pending_count = (
                    SELECT COUNT(*) FROM rma_devices WHERE submission_id = ?1
                      AND approval_status IN ('PENDING', 'UNDER_REVIEW', 'INFO_REQUESTED')
                ),
                approved_count = (
                    SELECT COUNT(*) FROM rma_devices WHERE submission_id = ?1
                      AND approval_status IN ('APPROVED', 'SYNCED')
                ),
                denied_count = (
                    SELECT COUNT(*) FROM rma_devices WHERE submission_id = ?1
                      AND approval_status = 'DENIED'
                ),
                updated_at = ?2
            WHERE id = ?1
            "#,
            params![submission_id, now_rfc3339],
        )?;
        Ok(())
    }

    /// 重算聚合计数(独立调用,自行取锁)
    pub fn recompute_counters(&self, submission_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::recompute_counters_on(&conn, submission_id, &self.clock.now().to_rfc3339())
    }

    fn find_by_id_on(conn: &Connection, id: i64) -> RepositoryResult<Option<Submission>> {
        let submission = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_SUBMISSION),
                params![id],
                map_submission,
            )
            .optional()?;
        Ok(submission)
    }
}

const SELECT_SUBMISSION: &str = r#"
    SELECT
        id, reference_number, company_name, company_email, order_number,
        customer_type, overall_status, total_devices, pending_count,
        approved_count, denied_count, created_at, updated_at
    FROM rma_submissions
"#;

fn map_submission(row: &Row<'_>) -> rusqlite::Result<Submission> {
    Ok(Submission {
        id: row.get(0)?,
        reference_number: row.get(1)?,
        company_name: row.get(2)?,
        company_email: row.get(3)?,
        order_number: row.get(4)?,
        customer_type: CustomerType::parse(&row.get::<_, String>(5)?)
            .unwrap_or(CustomerType::Us),
        overall_status: row.get(6)?,
        total_devices: row.get(7)?,
        pending_count: row.get(8)?,
        approved_count: row.get(9)?,
        denied_count: row.get(10)?,
        created_at: parse_utc(&row.get::<_, String>(11)?),
        updated_at: parse_utc(&row.get::<_, String>(12)?),
    })
}

/// 对外引用号: RMA- + UUID 前 8 位(大写)
fn generate_reference_number() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("RMA-{}", token[..8].to_uppercase())
}
