// ==========================================
// 移动设备返修录入系统 - 同步重试队列仓储
// ==========================================
// 状态机: QUEUED → RETRYING → (SUCCESS | FAILED)
// 红线: 终态条目不可再变更; FAILED 仅人工介入
// 排程: 首次延迟 base_delay,其后每次失败翻倍(base << retry_count)
// ==========================================

use crate::clock::SharedClock;
use crate::domain::device::Device;
use crate::domain::retry::RetryQueueEntry;
use crate::domain::types::SyncStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::parse_utc;
use chrono::Duration;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 首次重试延迟(秒)
pub const DEFAULT_BASE_DELAY_SECS: i64 = 300;

/// 默认最大重试次数
pub const DEFAULT_MAX_RETRIES: i32 = 5;

// ==========================================
// RetryQueueRepository - 重试队列仓储
// ==========================================
pub struct RetryQueueRepository {
    conn: Arc<Mutex<Connection>>,
    clock: SharedClock,
    base_delay_secs: i64,
    max_retries: i32,
}

impl RetryQueueRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>, clock: SharedClock) -> Self {
        Self {
            conn,
            clock,
            base_delay_secs: DEFAULT_BASE_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_schedule(mut self, base_delay_secs: i64, max_retries: i32) -> Self {
        self.base_delay_secs = base_delay_secs;
        self.max_retries = max_retries;
        self
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 设备同步失败入队
    ///
    /// # 行为
    /// - 该设备已有未终态条目时只更新错误信息(不重复入队,不重置计数)
    /// - 否则新建 QUEUED 条目: retry_count=0, next_retry_at=now+base_delay,
    ///   payload 存入队时刻的设备行快照(JSON),重试不依赖原记录可重取
    pub fn enqueue(&self, device: &Device, error_message: &str) -> RepositoryResult<RetryQueueEntry> {
        let conn = self.get_conn()?;
        let now = self.clock.now();
        let now_str = now.to_rfc3339();

        if let Some(existing) = Self::find_active_by_device_on(&conn, device.id)? {
            conn.execute(
                r#"
                UPDATE sync_retry_queue SET
                    error_message = ?1, last_error_at = ?2, updated_at = ?2
                WHERE id = ?3
                "#,
                params![error_message, now_str, existing.id],
            )?;
            tracing::debug!(
                entry_id = existing.id,
                device_id = device.id,
                "重试条目已存在,仅更新错误信息"
            );
            return Self::find_by_id_on(&conn, existing.id)?.ok_or(RepositoryError::NotFound {
                entity: "RetryQueueEntry".to_string(),
                id: existing.id.to_string(),
            });
        }

        let next_retry = (now + Duration::seconds(self.base_delay_secs)).to_rfc3339();
        let payload = serde_json::to_string(device)?;

        conn.execute(
            r#"
            INSERT INTO sync_retry_queue
                (device_id, submission_id, retry_count, max_retries, next_retry_at,
                 error_message, last_error_at, payload, status, created_at, updated_at)
            VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7, 'QUEUED', ?6, ?6)
            "#,
            params![
                device.id,
                device.submission_id,
                self.max_retries,
                next_retry,
                error_message,
                now_str,
                payload,
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::info!(
            entry_id = id,
            device_id = device.id,
            next_retry = %next_retry,
            "同步失败,设备已入重试队列"
        );

        Self::find_by_id_on(&conn, id)?.ok_or(RepositoryError::NotFound {
            entity: "RetryQueueEntry".to_string(),
            id: id.to_string(),
        })
    }

    /// 到期待处理条目(未终态且 next_retry_at 已到)
    pub fn due_entries(&self) -> RepositoryResult<Vec<RetryQueueEntry>> {
        let conn = self.get_conn()?;
        let now_str = self.clock.now().to_rfc3339();

        let mut stmt = conn.prepare(&format!(
            r#"{}
            WHERE status IN ('QUEUED', 'RETRYING')
              AND next_retry_at IS NOT NULL AND next_retry_at <= ?1
            ORDER BY next_retry_at, id
            "#,
            SELECT_ENTRY
        ))?;
        let entries = stmt
            .query_map(params![now_str], map_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// 标记同步成功(终态 SUCCESS)
    pub fn mark_success(&self, entry_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let entry = Self::require_active(&conn, entry_id, "SUCCESS")?;

        conn.execute(
            "UPDATE sync_retry_queue SET status = 'SUCCESS', updated_at = ?1 WHERE id = ?2",
            params![self.clock.now().to_rfc3339(), entry.id],
        )?;
        tracing::info!(entry_id, device_id = entry.device_id, "重试同步成功");
        Ok(())
    }

    /// 记录一次重试失败
    ///
    /// # 行为
    /// - retry_count + 1
    /// - 未耗尽 → RETRYING,按翻倍退避重新排期
    /// - 耗尽(达 max_retries)→ FAILED 终态,next_retry_at 置空,运维告警
    pub fn mark_retry(&self, entry_id: i64, error_message: &str) -> RepositoryResult<SyncStatus> {
        let conn = self.get_conn()?;
        let entry = Self::require_active(&conn, entry_id, "RETRYING")?;

        let now = self.clock.now();
        let now_str = now.to_rfc3339();
        let new_count = entry.retry_count + 1;

        if new_count >= entry.max_retries {
            conn.execute(
                r#"
                UPDATE sync_retry_queue SET
                    status = 'FAILED', retry_count = ?1, next_retry_at = NULL,
                    error_message = ?2, last_error_at = ?3, updated_at = ?3
                WHERE id = ?4
                "#,
                params![new_count, error_message, now_str, entry.id],
            )?;
            tracing::error!(
                entry_id,
                device_id = entry.device_id,
                retries = new_count,
                "重试次数耗尽,条目转入 FAILED,需人工介入"
            );
            return Ok(SyncStatus::Failed);
        }

        // 翻倍退避: base << retry_count
        let delay = self.base_delay_secs << new_count;
        let next_retry = (now + Duration::seconds(delay)).to_rfc3339();
        conn.execute(
            r#"
            UPDATE sync_retry_queue SET
                status = 'RETRYING', retry_count = ?1, next_retry_at = ?2,
                error_message = ?3, last_error_at = ?4, updated_at = ?4
            WHERE id = ?5
            "#,
            params![new_count, next_retry, error_message, now_str, entry.id],
        )?;
        tracing::warn!(
            entry_id,
            device_id = entry.device_id,
            retry_count = new_count,
            next_retry = %next_retry,
            "重试失败,已重新排期"
        );
        Ok(SyncStatus::Retrying)
    }

    /// FAILED 终态条目列表(人工介入清单)
    pub fn list_failed(&self) -> RepositoryResult<Vec<RetryQueueEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE status = 'FAILED' ORDER BY updated_at DESC",
            SELECT_ENTRY
        ))?;
        let entries = stmt
            .query_map([], map_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<RetryQueueEntry>> {
        let conn = self.get_conn()?;
        Self::find_by_id_on(&conn, id)
    }

    pub fn find_active_by_device(&self, device_id: i64) -> RepositoryResult<Option<RetryQueueEntry>> {
        let conn = self.get_conn()?;
        Self::find_active_by_device_on(&conn, device_id)
    }

    /// 加载条目并要求未终态(终态变更是无效状态转换)
    fn require_active(
        conn: &Connection,
        entry_id: i64,
        target: &str,
    ) -> RepositoryResult<RetryQueueEntry> {
        let entry = Self::find_by_id_on(conn, entry_id)?.ok_or(RepositoryError::NotFound {
            entity: "RetryQueueEntry".to_string(),
            id: entry_id.to_string(),
        })?;

        if entry.status.is_terminal() {
            return Err(RepositoryError::InvalidStateTransition {
                from: entry.status.to_string(),
                to: target.to_string(),
            });
        }
        Ok(entry)
    }

    fn find_by_id_on(conn: &Connection, id: i64) -> RepositoryResult<Option<RetryQueueEntry>> {
        let entry = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_ENTRY),
                params![id],
                map_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn find_active_by_device_on(
        conn: &Connection,
        device_id: i64,
    ) -> RepositoryResult<Option<RetryQueueEntry>> {
        let entry = conn
            .query_row(
                &format!(
                    "{} WHERE device_id = ?1 AND status IN ('QUEUED', 'RETRYING')
                     ORDER BY id DESC LIMIT 1",
                    SELECT_ENTRY
                ),
                params![device_id],
                map_entry,
            )
            .optional()?;
        Ok(entry)
    }
}

const SELECT_ENTRY: &str = r#"
    SELECT
        id, device_id, submission_id, retry_count, max_retries,
        next_retry_at, error_message, last_error_at, payload,
        status, created_at, updated_at
    FROM sync_retry_queue
"#;

fn map_entry(row: &Row<'_>) -> rusqlite::Result<RetryQueueEntry> {
    Ok(RetryQueueEntry {
        id: row.get(0)?,
        device_id: row.get(1)?,
        submission_id: row.get(2)?,
        retry_count: row.get(3)?,
        max_retries: row.get(4)?,
        next_retry_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_utc(&s)),
        error_message: row.get(6)?,
        last_error_at: row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_utc(&s)),
        payload: row.get(8)?,
        status: SyncStatus::parse(&row.get::<_, String>(9)?).unwrap_or(SyncStatus::Queued),
        created_at: parse_utc(&row.get::<_, String>(10)?),
        updated_at: parse_utc(&row.get::<_, String>(11)?),
    })
}
