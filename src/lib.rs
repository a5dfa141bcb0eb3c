// ==========================================
// 移动设备返修录入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 客户返修表格的录入、校验与下游同步
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 提取层 - 表格文件解析与 IMEI 校验
pub mod extractor;

// 数据仓储层 - 数据访问
pub mod repository;

// 同步层 - 下游同步与重试
pub mod sync;

// API 层 - 业务接口
pub mod api;

// 时钟抽象
pub mod clock;

// 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ApprovalStatus, CanonicalField, CellKind, SyncStatus};

// 领域实体
pub use domain::{
    BatchValidationReport, Device, DeviceRecord, DuplicateCheckResult, ImeiError, ImeiWarning,
    NewSubmission, RetryQueueEntry, Submission, SweepReport, ValidationResult,
};

// 提取层
pub use extractor::{DeviceExtractor, ExtractionReport, ImeiValidator, RawCell};

// 仓储层
pub use repository::{
    DeviceRepository, RetryQueueRepository, SubmissionRepository,
};

// 同步层
pub use sync::{DeviceSyncer, SyncError, SyncSweeper};

// API
pub use api::{ApiError, ApiResult, IntakeApi, IntakeReport};

// 基础设施
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::AppConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "移动设备返修录入系统";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
