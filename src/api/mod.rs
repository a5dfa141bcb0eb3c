// ==========================================
// 移动设备返修录入系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 CLI / 服务端调用
// ==========================================

pub mod error;
pub mod intake;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use intake::{IntakeApi, IntakeReport};
