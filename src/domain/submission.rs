// ==========================================
// 移动设备返修录入系统 - 提交批次领域模型
// ==========================================
// 职责: 客户提交批次实体与聚合计数
// 红线: 计数字段只能由设备集合重算得出,不得独立手工维护
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// CustomerType - 客户类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Us,
    International,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Us => "us",
            CustomerType::International => "international",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "us" => Some(CustomerType::Us),
            "international" => Some(CustomerType::International),
            _ => None,
        }
    }
}

// ==========================================
// NewSubmission - 创建提交批次的输入
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubmission {
    pub company_name: String,
    pub company_email: String,
    pub order_number: Option<String>,
    pub customer_type: CustomerType,
}

// ==========================================
// Submission - 提交批次实体
// ==========================================
// 对齐: rma_submissions 表
// 计数字段由 SubmissionRepository::recompute_counters 维护
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub reference_number: String, // 对外引用号(RMA-xxxx)
    pub company_name: String,
    pub company_email: String,
    pub order_number: Option<String>,
    pub customer_type: CustomerType,
    pub overall_status: String,

    // ===== 聚合计数(重算口径)=====
    pub total_devices: i64,
    pub pending_count: i64,
    pub approved_count: i64,
    pub denied_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
