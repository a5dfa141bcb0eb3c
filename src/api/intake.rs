// ==========================================
// 移动设备返修录入系统 - 录入API
// ==========================================
// 职责: 封装"建批次 → 提取 → 校验 → 重复检测 → 落库"完整链路
// 红线: 提取失败(无表头/文件损坏)不产生提交批次
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::clock::SharedClock;
use crate::config::AppConfig;
use crate::db::open_sqlite_connection;
use crate::domain::device::{BatchValidationReport, Device};
use crate::domain::retry::RetryQueueEntry;
use crate::domain::submission::{NewSubmission, Submission};
use crate::domain::types::ApprovalStatus;
use crate::extractor::cell::RawCell;
use crate::extractor::device_extractor::DeviceExtractor;
use crate::extractor::validator::ImeiValidator;
use crate::repository::device_repo::DeviceRepository;
use crate::repository::retry_queue_repo::RetryQueueRepository;
use crate::repository::schema::init_schema;
use crate::repository::submission_repo::SubmissionRepository;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 录入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeReport {
    /// 新建的提交批次
    pub submission: Submission,
    /// 落库后的设备列表(含状态与重复标记)
    pub devices: Vec<Device>,
    /// 源文件网格总行数
    pub total_rows: usize,
    /// 表头行号(0 起)
    pub header_row: usize,
    /// 有效设备数
    pub valid_count: usize,
    /// 无效设备数(转 INFO_REQUESTED)
    pub invalid_count: usize,
    /// 命中重复检测的设备数
    pub duplicate_count: usize,
    /// 录入耗时（毫秒）
    pub elapsed_ms: i64,
}

// ==========================================
// IntakeApi - 录入API
// ==========================================
pub struct IntakeApi {
    submissions: SubmissionRepository,
    devices: Arc<DeviceRepository>,
    queue: Arc<RetryQueueRepository>,
    extractor: DeviceExtractor,
}

impl IntakeApi {
    /// 创建新的IntakeApi实例(打开数据库并确保建表)
    pub fn new(config: &AppConfig, clock: SharedClock) -> ApiResult<Self> {
        let conn = open_sqlite_connection(&config.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn)), config, clock))
    }

    /// 从已有连接创建(测试/共享连接场景)
    ///
    /// 说明：为保证连接行为一致，调用方需已应用统一 PRAGMA 并完成建表。
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        config: &AppConfig,
        clock: SharedClock,
    ) -> Self {
        let submissions = SubmissionRepository::from_connection(conn.clone(), clock.clone());
        let devices = Arc::new(
            DeviceRepository::from_connection(conn.clone(), clock.clone())
                .with_duplicate_window(config.duplicate_window_days),
        );
        let queue = Arc::new(
            RetryQueueRepository::from_connection(conn, clock)
                .with_schedule(config.retry_base_delay_secs, config.max_retries),
        );

        Self {
            submissions,
            devices,
            queue,
            extractor: DeviceExtractor::new(config.header_scan_rows),
        }
    }

    /// 从表格文件录入一个提交批次
    ///
    /// # 流程
    /// 1. 提取(表头定位失败整文件拒收,不建批次)
    /// 2. 创建提交批次
    /// 3. 设备批量落库(单事务: 重复检测 + 强制状态 + 计数重算)
    pub fn ingest_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        new: &NewSubmission,
    ) -> ApiResult<IntakeReport> {
        let started = std::time::Instant::now();
        let path = file_path.as_ref();

        let extraction = self.extractor.extract_from_file(path)?;
        if extraction.records.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "文件 {} 中未提取到任何设备行",
                path.display()
            )));
        }

        let submission = self.submissions.create(new)?;
        let devices = self
            .devices
            .insert_batch(submission.id, &extraction.records)?;

        // 落库后重读批次,拿到重算过的计数
        let submission = self
            .submissions
            .find_by_id(submission.id)?
            .ok_or_else(|| ApiError::NotFound(format!("Submission(id={})不存在", submission.id)))?;

        let invalid_count = devices.iter().filter(|d| !d.imei_valid).count();
        let duplicate_count = devices.iter().filter(|d| d.is_duplicate).count();
        let report = IntakeReport {
            total_rows: extraction.total_rows,
            header_row: extraction.header.row_index,
            valid_count: devices.len() - invalid_count,
            invalid_count,
            duplicate_count,
            elapsed_ms: started.elapsed().as_millis() as i64,
            submission,
            devices,
        };

        tracing::info!(
            reference = %report.submission.reference_number,
            devices = report.devices.len(),
            invalid = report.invalid_count,
            duplicates = report.duplicate_count,
            elapsed_ms = report.elapsed_ms,
            "文件录入完成"
        );
        Ok(report)
    }

    /// 批量校验 IMEI 文本值(表单粘贴路径,不落库)
    pub fn validate_imeis(&self, values: &[String]) -> BatchValidationReport {
        let cells: Vec<RawCell> = values
            .iter()
            .map(|v| {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::text(trimmed)
                }
            })
            .collect();
        ImeiValidator::validate_batch(&cells)
    }

    /// 按引用号查询提交批次
    pub fn find_submission(&self, reference: &str) -> ApiResult<Option<Submission>> {
        Ok(self.submissions.find_by_reference(reference)?)
    }

    /// 批次内设备列表
    pub fn submission_devices(&self, submission_id: i64) -> ApiResult<Vec<Device>> {
        Ok(self.devices.find_by_submission(submission_id)?)
    }

    /// 审批状态变更
    pub fn set_device_status(&self, device_id: i64, status: ApprovalStatus) -> ApiResult<()> {
        self.devices.set_approval_status(device_id, status)?;
        Ok(())
    }

    /// 人工覆写重复标记
    pub fn override_duplicate(&self, device_id: i64, reason: &str) -> ApiResult<()> {
        if reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("覆写理由不能为空".to_string()));
        }
        self.devices.override_duplicate(device_id, reason)?;
        Ok(())
    }

    /// 重试耗尽的同步条目(人工介入清单)
    pub fn failed_sync_entries(&self) -> ApiResult<Vec<RetryQueueEntry>> {
        Ok(self.queue.list_failed()?)
    }

    /// 设备仓储句柄(同步扫描器装配用)
    pub fn device_repo(&self) -> Arc<DeviceRepository> {
        self.devices.clone()
    }

    /// 重试队列仓储句柄(同步扫描器装配用)
    pub fn retry_queue_repo(&self) -> Arc<RetryQueueRepository> {
        self.queue.clone()
    }
}
