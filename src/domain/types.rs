// ==========================================
// 移动设备返修录入系统 - 领域类型定义
// ==========================================
// 职责: 审批状态 / 同步状态 / 单元格类型 / 规范字段
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 审批状态 (Approval Status)
// ==========================================
// 红线: 校验失败/重复标记的设备强制进入 INFO_REQUESTED,不得自动审批
// 终态: DENIED / SYNCED (不参与重复检测的"存活"范围)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,       // 待审核
    UnderReview,   // 审核中
    InfoRequested, // 待补充信息(校验失败/重复标记)
    Approved,      // 已通过
    Denied,        // 已拒绝(终态)
    Synced,        // 已同步下游(终态)
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::UnderReview => "UNDER_REVIEW",
            ApprovalStatus::InfoRequested => "INFO_REQUESTED",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Denied => "DENIED",
            ApprovalStatus::Synced => "SYNCED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ApprovalStatus::Pending),
            "UNDER_REVIEW" => Some(ApprovalStatus::UnderReview),
            "INFO_REQUESTED" => Some(ApprovalStatus::InfoRequested),
            "APPROVED" => Some(ApprovalStatus::Approved),
            "DENIED" => Some(ApprovalStatus::Denied),
            "SYNCED" => Some(ApprovalStatus::Synced),
            _ => None,
        }
    }

    /// 是否为"存活"状态（参与 90 天窗口内的重复检测）
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            ApprovalStatus::Pending
                | ApprovalStatus::UnderReview
                | ApprovalStatus::InfoRequested
                | ApprovalStatus::Approved
        )
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 同步状态 (Sync Status)
// ==========================================
// 状态机: QUEUED → RETRYING → (SUCCESS | FAILED)
// 红线: FAILED 为终态,仅人工介入,不再自动重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Queued,   // 待重试
    Retrying, // 重试中
    Failed,   // 重试耗尽(终态,运维告警)
    Success,  // 同步成功(终态)
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Queued => "QUEUED",
            SyncStatus::Retrying => "RETRYING",
            SyncStatus::Failed => "FAILED",
            SyncStatus::Success => "SUCCESS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUEUED" => Some(SyncStatus::Queued),
            "RETRYING" => Some(SyncStatus::Retrying),
            "FAILED" => Some(SyncStatus::Failed),
            "SUCCESS" => Some(SyncStatus::Success),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Failed | SyncStatus::Success)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 单元格类型标签 (Cell Kind)
// ==========================================
// 用途: 记录 IMEI 来源单元格的存储类型,供人工复核参考
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellKind {
    Empty,  // 空单元格(缺失视同空)
    Text,   // 文本存储
    Number, // 数值存储(可能发生精度丢失)
    Bool,   // 布尔
    Error,  // 公式错误
}

impl CellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Empty => "EMPTY",
            CellKind::Text => "TEXT",
            CellKind::Number => "NUMBER",
            CellKind::Bool => "BOOL",
            CellKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 规范字段 (Canonical Field)
// ==========================================
// 用途: 表头模糊匹配的目标字段集合
// 红线: 匹配按 ALL 的顺序逐字段评估,先到先得(确定性裁决,
//       歧义表头归属评估顺序靠前的字段,属已知限制而非契约)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Imei,
    Model,
    Storage,
    Condition,
    IssueDescription,
    IssueCategory,
    RequestedAction,
    UnitPrice,
    RepairCost,
}

impl CanonicalField {
    /// 字典顺序(歧义表头的裁决顺序,Imei 必须在首位)
    pub const ALL: [CanonicalField; 9] = [
        CanonicalField::Imei,
        CanonicalField::Model,
        CanonicalField::Storage,
        CanonicalField::Condition,
        CanonicalField::IssueDescription,
        CanonicalField::IssueCategory,
        CanonicalField::RequestedAction,
        CanonicalField::UnitPrice,
        CanonicalField::RepairCost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Imei => "imei",
            CanonicalField::Model => "model",
            CanonicalField::Storage => "storage",
            CanonicalField::Condition => "condition",
            CanonicalField::IssueDescription => "issue_description",
            CanonicalField::IssueCategory => "issue_category",
            CanonicalField::RequestedAction => "requested_action",
            CanonicalField::UnitPrice => "unit_price",
            CanonicalField::RepairCost => "repair_cost",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
