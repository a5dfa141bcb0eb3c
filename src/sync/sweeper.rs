// ==========================================
// 移动设备返修录入系统 - 同步扫描器
// ==========================================
// 职责: 已审批设备的首次同步 + 重试队列的周期处理
// 红线: 单条同步失败不中断本轮扫描; 首次失败入队而非就地重试
// ==========================================

use crate::domain::device::Device;
use crate::domain::retry::{RetryQueueEntry, SweepReport};
use crate::domain::types::SyncStatus;
use crate::repository::device_repo::DeviceRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::retry_queue_repo::RetryQueueRepository;
use crate::sync::syncer::DeviceSyncer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==========================================
// InitialSyncReport - 首次同步批次结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitialSyncReport {
    pub synced: Vec<i64>,   // 同步成功的设备 id
    pub enqueued: Vec<i64>, // 失败入队的重试条目 id
}

// ==========================================
// SyncSweeper - 同步扫描器
// ==========================================
pub struct SyncSweeper {
    devices: Arc<DeviceRepository>,
    queue: Arc<RetryQueueRepository>,
    syncer: Arc<dyn DeviceSyncer>,
}

impl SyncSweeper {
    pub fn new(
        devices: Arc<DeviceRepository>,
        queue: Arc<RetryQueueRepository>,
        syncer: Arc<dyn DeviceSyncer>,
    ) -> Self {
        Self {
            devices,
            queue,
            syncer,
        }
    }

    /// 已审批且未同步设备的首次同步
    ///
    /// # 行为
    /// - 成功 → 设备转 SYNCED
    /// - 失败 → 入重试队列(首次延迟后由 process_due 接手),设备状态不变
    pub async fn sync_approved(&self) -> RepositoryResult<InitialSyncReport> {
        let pending = self.devices.devices_for_sync()?;
        tracing::info!(count = pending.len(), "开始首次同步扫描");

        let mut report = InitialSyncReport::default();
        for device in pending {
            match self.syncer.sync_device(&device).await {
                Ok(()) => {
                    self.devices.mark_synced(device.id)?;
                    report.synced.push(device.id);
                }
                Err(e) => {
                    let entry = self.queue.enqueue(&device, &e.to_string())?;
                    report.enqueued.push(entry.id);
                }
            }
        }

        tracing::info!(
            synced = report.synced.len(),
            enqueued = report.enqueued.len(),
            "首次同步扫描完成"
        );
        Ok(report)
    }

    /// 处理到期的重试条目
    ///
    /// # 行为
    /// - 成功 → 条目 SUCCESS,设备转 SYNCED
    /// - 失败且未耗尽 → RETRYING,翻倍退避重新排期
    /// - 失败且耗尽 → FAILED 终态,进入人工介入清单
    /// - 单条仓储错误(设备已被清理/并发扫描抢先变更)只记日志,
    ///   不中断本轮其余条目
    pub async fn process_due(&self) -> RepositoryResult<SweepReport> {
        let due = self.queue.due_entries()?;
        tracing::info!(count = due.len(), "开始重试队列扫描");

        let mut report = SweepReport::default();
        for entry in due {
            if let Err(e) = self.process_entry(&entry, &mut report).await {
                tracing::error!(
                    entry_id = entry.id,
                    device_id = entry.device_id,
                    error = %e,
                    "重试条目处理失败,跳过本条"
                );
            }
        }

        tracing::info!(
            succeeded = report.succeeded.len(),
            retried = report.retried.len(),
            failed = report.failed.len(),
            "重试队列扫描完成"
        );
        Ok(report)
    }

    async fn process_entry(
        &self,
        entry: &RetryQueueEntry,
        report: &mut SweepReport,
    ) -> RepositoryResult<()> {
        let device = self.resolve_device(entry)?;

        match self.syncer.sync_device(&device).await {
            Ok(()) => {
                self.queue.mark_success(entry.id)?;
                self.devices.mark_synced(entry.device_id)?;
                report.succeeded.push(entry.id);
            }
            Err(e) => match self.queue.mark_retry(entry.id, &e.to_string())? {
                SyncStatus::Failed => report.failed.push(entry.id),
                _ => report.retried.push(entry.id),
            },
        }
        Ok(())
    }

    /// 取重试用的设备数据: 优先当前库内记录,缺失时回落入队快照
    fn resolve_device(&self, entry: &RetryQueueEntry) -> RepositoryResult<Device> {
        if let Some(device) = self.devices.find_by_id(entry.device_id)? {
            return Ok(device);
        }

        let payload = entry.payload.as_deref().ok_or(RepositoryError::NotFound {
            entity: "Device".to_string(),
            id: entry.device_id.to_string(),
        })?;
        let device: Device = serde_json::from_str(payload)?;
        tracing::warn!(
            entry_id = entry.id,
            device_id = entry.device_id,
            "设备记录缺失,使用入队快照重试"
        );
        Ok(device)
    }
}
