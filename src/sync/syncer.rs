// ==========================================
// 移动设备返修录入系统 - 下游同步 Trait
// ==========================================
// 职责: 定义设备同步到下游系统的接口(不包含实现)
// 红线: 接口只表达"单设备同步一次"的语义,重试排程属扫描器
// ==========================================

use crate::domain::device::Device;
use async_trait::async_trait;
use thiserror::Error;

/// 同步失败类型
#[derive(Error, Debug)]
pub enum SyncError {
    /// 下游暂不可达(可重试)
    #[error("下游服务不可用: {0}")]
    Unavailable(String),

    /// 下游拒收该设备(可重试,由人工修正后再试)
    #[error("下游拒收设备: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// DeviceSyncer Trait
// ==========================================
// 实现者: 生产环境为下游仓储系统客户端,测试为脚本化桩
#[async_trait]
pub trait DeviceSyncer: Send + Sync {
    /// 同步单台设备到下游系统
    ///
    /// # 返回
    /// - Ok(()): 下游确认接收
    /// - Err(SyncError): 本次同步失败(是否重试由调用方决定)
    async fn sync_device(&self, device: &Device) -> Result<(), SyncError>;
}
