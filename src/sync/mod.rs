// ==========================================
// 移动设备返修录入系统 - 同步层
// ==========================================
// 职责: 已审批设备同步到下游 + 失败重试的状态机推进
// ==========================================

// 模块声明
pub mod sweeper;
pub mod syncer;

// 重导出核心类型
pub use sweeper::{InitialSyncReport, SyncSweeper};
pub use syncer::{DeviceSyncer, SyncError};
