// ==========================================
// 移动设备返修录入系统 - 设备仓储
// ==========================================
// 红线: 批量插入全量成败(单事务),不做部分写入
// 红线: 校验失败/重复标记的设备强制落库为 INFO_REQUESTED
// 说明: 重复检测为建议性(命中只打标,不阻断插入),
//       覆写入口由管理端调用 override_duplicate
// ==========================================

use crate::clock::SharedClock;
use crate::domain::device::{Device, DeviceRecord, DuplicateCheckResult};
use crate::domain::types::ApprovalStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::parse_utc;
use crate::repository::submission_repo::SubmissionRepository;
use chrono::Duration;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 重复检测默认回看窗口(天)
pub const DEFAULT_DUPLICATE_WINDOW_DAYS: i64 = 90;

// ==========================================
// DeviceRepository - 设备仓储
// ==========================================
pub struct DeviceRepository {
    conn: Arc<Mutex<Connection>>,
    clock: SharedClock,
    duplicate_window_days: i64,
}

impl DeviceRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>, clock: SharedClock) -> Self {
        Self {
            conn,
            clock,
            duplicate_window_days: DEFAULT_DUPLICATE_WINDOW_DAYS,
        }
    }

    pub fn with_duplicate_window(mut self, days: i64) -> Self {
        self.duplicate_window_days = days;
        self
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量插入提取产物(单事务,全量成败)
    ///
    /// # 行为
    /// - 每条记录先做存活 + 窗口内重复检测(含本事务已插入的同批记录,
    ///   批内重复因此同样被打标)
    /// - 校验失败或命中重复 → 强制 INFO_REQUESTED,否则 PENDING
    /// - 落库后在同事务内重算批次计数
    pub fn insert_batch(
        &self,
        submission_id: i64,
        records: &[DeviceRecord],
    ) -> RepositoryResult<Vec<Device>> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let now = self.clock.now();
        let now_str = now.to_rfc3339();
        let cutoff = (now - Duration::days(self.duplicate_window_days)).to_rfc3339();

        let mut inserted_ids = Vec::with_capacity(records.len());
        for record in records {
            let dup = check_duplicate_on(&tx, &record.imei, None, &cutoff)?;

            let status = if !record.validation.is_valid || dup.is_duplicate {
                ApprovalStatus::InfoRequested
            } else {
                ApprovalStatus::Pending
            };

            let errors_json = if record.validation.errors.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&record.validation.errors)?)
            };
            let warnings_json = if record.validation.warnings.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&record.validation.warnings)?)
            };

            tx.execute(
                r#"
                INSERT INTO rma_devices
                    (submission_id, imei, imei_raw, imei_valid,
                     validation_errors, validation_warnings,
                     model, storage, condition, issue_description,
                     issue_category, requested_action, unit_price, repair_cost,
                     approval_status, is_duplicate, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                        ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)
                "#,
                params![
                    submission_id,
                    record.imei,
                    record.imei_raw,
                    record.validation.is_valid,
                    errors_json,
                    warnings_json,
                    record.model,
                    record.storage,
                    record.condition,
                    record.issue_description,
                    record.issue_category,
                    record.requested_action,
                    record.unit_price,
                    record.repair_cost,
                    status.as_str(),
                    dup.is_duplicate,
                    now_str,
                ],
            )?;
            inserted_ids.push(tx.last_insert_rowid());

            if dup.is_duplicate {
                tracing::warn!(
                    imei = %record.imei,
                    existing_device_id = ?dup.existing_device_id,
                    "设备命中重复检测,已标记并转 INFO_REQUESTED"
                );
            }
        }

        SubmissionRepository::recompute_counters_on(&tx, submission_id, &now_str)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(
            submission_id,
            inserted = inserted_ids.len(),
            "设备批量插入完成"
        );

        let mut devices = Vec::with_capacity(inserted_ids.len());
        for id in inserted_ids {
            let device = Self::find_by_id_on(&conn, id)?.ok_or(RepositoryError::NotFound {
                entity: "Device".to_string(),
                id: id.to_string(),
            })?;
            devices.push(device);
        }
        Ok(devices)
    }

    /// 重复检测: 同 IMEI + 存活状态 + 回看窗口内
    ///
    /// # 参数
    /// - exclude_device_id: 排除的设备 id(编辑既有设备时排除自身)
    pub fn check_duplicate(
        &self,
        imei: &str,
        exclude_device_id: Option<i64>,
    ) -> RepositoryResult<DuplicateCheckResult> {
        let conn = self.get_conn()?;
        let cutoff =
            (self.clock.now() - Duration::days(self.duplicate_window_days)).to_rfc3339();
        check_duplicate_on(&conn, imei, exclude_device_id, &cutoff)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Device>> {
        let conn = self.get_conn()?;
        Self::find_by_id_on(&conn, id)
    }

    pub fn find_by_submission(&self, submission_id: i64) -> RepositoryResult<Vec<Device>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE submission_id = ?1 ORDER BY id",
            SELECT_DEVICE
        ))?;
        let devices = stmt
            .query_map(params![submission_id], map_device)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(devices)
    }

    /// 更新审批状态并重算批次计数
    pub fn set_approval_status(
        &self,
        device_id: i64,
        status: ApprovalStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now_str = self.clock.now().to_rfc3339();

        let changed = conn.execute(
            "UPDATE rma_devices SET approval_status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now_str, device_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Device".to_string(),
                id: device_id.to_string(),
            });
        }

        let submission_id: i64 = conn.query_row(
            "SELECT submission_id FROM rma_devices WHERE id = ?1",
            params![device_id],
            |row| row.get(0),
        )?;
        SubmissionRepository::recompute_counters_on(&conn, submission_id, &now_str)?;
        Ok(())
    }

    /// 人工覆写重复标记(保留 is_duplicate 痕迹,状态回到 PENDING)
    pub fn override_duplicate(&self, device_id: i64, reason: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now_str = self.clock.now().to_rfc3339();

        let changed = conn.execute(
            r#"
            UPDATE rma_devices SET
                duplicate_override = 1,
                duplicate_override_reason = ?1,
                approval_status = 'PENDING',
                updated_at = ?2
            WHERE id = ?3 AND is_duplicate = 1
            "#,
            params![reason, now_str, device_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::FieldValueError {
                field: "is_duplicate".to_string(),
                message: format!("设备 {} 不存在或未被标记为重复", device_id),
            });
        }

        let submission_id: i64 = conn.query_row(
            "SELECT submission_id FROM rma_devices WHERE id = ?1",
            params![device_id],
            |row| row.get(0),
        )?;
        SubmissionRepository::recompute_counters_on(&conn, submission_id, &now_str)?;
        tracing::info!(device_id, reason, "重复标记已人工覆写");
        Ok(())
    }

    /// 标记设备已同步(终态 SYNCED)
    pub fn mark_synced(&self, device_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now_str = self.clock.now().to_rfc3339();

        let changed = conn.execute(
            r#"
            UPDATE rma_devices SET
                synced = 1, synced_at = ?1,
                approval_status = 'SYNCED', updated_at = ?1
            WHERE id = ?2
            "#,
            params![now_str, device_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Device".to_string(),
                id: device_id.to_string(),
            });
        }

        let submission_id: i64 = conn.query_row(
            "SELECT submission_id FROM rma_devices WHERE id = ?1",
            params![device_id],
            |row| row.get(0),
        )?;
        SubmissionRepository::recompute_counters_on(&conn, submission_id, &now_str)?;
        Ok(())
    }

    /// 待同步设备(已审批通过且未同步)
    pub fn devices_for_sync(&self) -> RepositoryResult<Vec<Device>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE approval_status = 'APPROVED' AND synced = 0 ORDER BY id",
            SELECT_DEVICE
        ))?;
        let devices = stmt
            .query_map([], map_device)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(devices)
    }

    fn find_by_id_on(conn: &Connection, id: i64) -> RepositoryResult<Option<Device>> {
        let device = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_DEVICE),
                params![id],
                map_device,
            )
            .optional()?;
        Ok(device)
    }
}

/// 重复检测核心查询(可在事务内复用)
fn check_duplicate_on(
    conn: &Connection,
    imei: &str,
    exclude_device_id: Option<i64>,
    cutoff_rfc3339: &str,
) -> RepositoryResult<DuplicateCheckResult> {
    let hit = conn
        .query_row(
            r#"
            SELECT d.id, d.submission_id, s.reference_number, d.approval_status
            FROM rma_devices d
            JOIN rma_submissions s ON s.id = d.submission_id
            WHERE d.imei = ?1
              AND d.approval_status IN ('PENDING', 'UNDER_REVIEW', 'INFO_REQUESTED', 'APPROVED')
              AND d.created_at >= ?2
              AND (?3 IS NULL OR d.id <> ?3)
            ORDER BY d.created_at DESC, d.id DESC
            LIMIT 1
            "#,
            params![imei, cutoff_rfc3339, exclude_device_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    match hit {
        Some((device_id, submission_id, reference, status)) => Ok(DuplicateCheckResult {
            is_duplicate: true,
            existing_device_id: Some(device_id),
            existing_submission_id: Some(submission_id),
            existing_reference: Some(reference),
            existing_status: ApprovalStatus::parse(&status),
        }),
        None => Ok(DuplicateCheckResult::not_duplicate()),
    }
}

const SELECT_DEVICE: &str = r#"
    SELECT
        id, submission_id, imei, imei_raw, imei_valid,
        validation_errors, validation_warnings,
        model, storage, condition, issue_description,
        issue_category, requested_action, unit_price, repair_cost,
        approval_status, is_duplicate, duplicate_override,
        duplicate_override_reason, synced, synced_at, created_at, updated_at
    FROM rma_devices
"#;

fn map_device(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        submission_id: row.get(1)?,
        imei: row.get(2)?,
        imei_raw: row.get(3)?,
        imei_valid: row.get(4)?,
        validation_errors: row.get(5)?,
        validation_warnings: row.get(6)?,
        model: row.get(7)?,
        storage: row.get(8)?,
        condition: row.get(9)?,
        issue_description: row.get(10)?,
        issue_category: row.get(11)?,
        requested_action: row.get(12)?,
        unit_price: row.get(13)?,
        repair_cost: row.get(14)?,
        approval_status: ApprovalStatus::parse(&row.get::<_, String>(15)?)
            .unwrap_or(ApprovalStatus::Pending),
        is_duplicate: row.get(16)?,
        duplicate_override: row.get(17)?,
        duplicate_override_reason: row.get(18)?,
        synced: row.get(19)?,
        synced_at: row
            .get::<_, Option<String>>(20)?
            .map(|s| parse_utc(&s)),
        created_at: parse_utc(&row.get::<_, String>(21)?),
        updated_at: parse_utc(&row.get::<_, String>(22)?),
    })
}
