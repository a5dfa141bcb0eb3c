// ==========================================
// 移动设备返修录入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含提取引擎逻辑
// ==========================================

pub mod device;
pub mod retry;
pub mod submission;
pub mod types;

// 重导出核心类型
pub use device::{
    BatchValidationReport, Device, DeviceRecord, DuplicateCheckResult, ImeiError, ImeiWarning,
    IndexedValidation, ValidationResult, ValidationSummary,
};
pub use retry::{RetryQueueEntry, SweepReport};
pub use submission::{CustomerType, NewSubmission, Submission};
pub use types::{ApprovalStatus, CanonicalField, CellKind, SyncStatus};
