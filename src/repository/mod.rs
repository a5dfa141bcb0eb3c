// ==========================================
// 移动设备返修录入系统 - 仓储层
// ==========================================
// 职责: rma_submissions / rma_devices / sync_retry_queue 的持久化访问
// 红线: Repository 不含业务逻辑; 时间列一律 RFC3339 文本
// ==========================================

// 模块声明
pub mod device_repo;
pub mod error;
pub mod retry_queue_repo;
pub mod schema;
pub mod submission_repo;

// 重导出核心类型
pub use device_repo::{DeviceRepository, DEFAULT_DUPLICATE_WINDOW_DAYS};
pub use error::{RepositoryError, RepositoryResult};
pub use retry_queue_repo::{RetryQueueRepository, DEFAULT_BASE_DELAY_SECS, DEFAULT_MAX_RETRIES};
pub use schema::init_schema;
pub use submission_repo::SubmissionRepository;

use chrono::{DateTime, Utc};

/// RFC3339 文本 → DateTime<Utc>(解析失败回落 epoch,不让读路径崩溃)
pub(crate) fn parse_utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH)
}
