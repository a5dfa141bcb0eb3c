// ==========================================
// 移动设备返修录入系统 - 同步重试队列领域模型
// ==========================================
// 职责: 下游同步失败的持久化重试条目
// 状态机: QUEUED → RETRYING → (SUCCESS | FAILED)
// ==========================================

use crate::domain::types::SyncStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RetryQueueEntry - 重试队列条目
// ==========================================
// 对齐: sync_retry_queue 表
// payload: 入队时刻的设备行快照(JSON),重试不依赖原记录可重取
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryQueueEntry {
    pub id: i64,
    pub device_id: i64,
    pub submission_id: i64,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub payload: Option<String>, // 设备行快照(JSON 文本)
    pub status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RetryQueueEntry {
    /// 重试次数是否已耗尽(下一次失败将转入 FAILED 终态)
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

// ==========================================
// SweepReport - 一次周期扫描的处理结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub succeeded: Vec<i64>, // 同步成功的条目 id
    pub retried: Vec<i64>,   // 失败后重新排期的条目 id
    pub failed: Vec<i64>,    // 本轮转入 FAILED 终态的条目 id
}

impl SweepReport {
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.retried.len() + self.failed.len()
    }
}
