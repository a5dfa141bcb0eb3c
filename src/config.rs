// ==========================================
// 移动设备返修录入系统 - 运行配置
// ==========================================
// 职责: 提取/重复判定/重试排程的可调参数,JSON 文件加载 + 默认值
// 红线: 默认值与校验/排程模块内的常量保持一致,配置只收紧不放宽语义
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 数据库文件路径
    pub db_path: String,

    /// 表头扫描窗口(行)
    pub header_scan_rows: usize,

    /// 重复判定回看窗口(天)
    pub duplicate_window_days: i64,

    /// 首次同步重试延迟(秒),其后每次失败翻倍
    pub retry_base_delay_secs: i64,

    /// 最大重试次数,达到后进入 FAILED 终态
    pub max_retries: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "rma_intake.db".to_string(),
            header_scan_rows: 20,
            duplicate_window_days: 90,
            retry_base_delay_secs: 300,
            max_retries: 5,
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载; 文件不存在时回落默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "配置文件不存在,使用默认配置");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), "配置加载完成");
        Ok(config)
    }
}
