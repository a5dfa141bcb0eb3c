// ==========================================
// 移动设备返修录入系统 - 设备领域模型
// ==========================================
// 职责: 提取产物 / 校验结果 / 重复检测结果 / 持久化设备实体
// 红线: DeviceRecord 在校验器附加结果之后不再变更
// ==========================================

use crate::domain::types::{ApprovalStatus, CellKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ImeiError - 阻断性校验错误
// ==========================================
// 红线: 任一错误存在即 is_valid = false,阻断自动审批
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImeiError {
    /// IMEI 为空或缺失
    Empty,
    /// 清洗后长度不等于 15 位
    WrongLength { found: usize },
    /// 清洗后不以 35 开头
    WrongPrefix,
    /// 清洗后仍含非数字字符(防御性检查,正常清洗路径不应出现)
    NonDigit,
}

impl fmt::Display for ImeiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImeiError::Empty => write!(f, "IMEI 为空"),
            ImeiError::WrongLength { found } => {
                write!(f, "IMEI 必须为 15 位数字(实际 {} 位)", found)
            }
            ImeiError::WrongPrefix => write!(f, "IMEI 必须以 35 开头"),
            ImeiError::NonDigit => write!(f, "IMEI 含非数字字符"),
        }
    }
}

// ==========================================
// ImeiWarning - 非阻断性异常标记
// ==========================================
// 用途: 不影响 is_valid,仅供人工复核参考
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImeiWarning {
    /// 原值为科学计数法,已自动还原
    ScientificNotation,
    /// 原值含小数点,已移除
    DecimalPoint,
    /// 清洗/补位改变了原值(与朴素去非数字结果不一致)
    CleanedFromFormatting,
    /// 数值存储疑似已发生精度丢失("含五连零"启发式,
    /// 非硬性判定,精确匹配重复检测不可信任该值)
    PrecisionLoss,
}

impl fmt::Display for ImeiWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImeiWarning::ScientificNotation => write!(f, "原值为科学计数法,已自动转换"),
            ImeiWarning::DecimalPoint => write!(f, "原值含小数点,已移除"),
            ImeiWarning::CleanedFromFormatting => write!(f, "IMEI 经过格式清洗"),
            ImeiWarning::PrecisionLoss => write!(f, "疑似精度丢失,重复检测不可信"),
        }
    }
}

// ==========================================
// ValidationResult - 单条校验结果
// ==========================================
// 不变量: is_valid ⇔ errors 为空; sanitized 无论是否有效都会计算,
//         以支持人工复核工具展示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub original: Option<String>,  // 原始文本形式(用户所见)
    pub sanitized: Option<String>, // 清洗/重建后的值
    pub is_valid: bool,
    pub errors: Vec<ImeiError>,
    pub warnings: Vec<ImeiWarning>,
}

impl ValidationResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// ==========================================
// IndexedValidation - 批量校验中的单条记录
// ==========================================
// duplicate_of: 批内重复时指向首次出现的序号(1 起),与单条有效性正交
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedValidation {
    pub index: usize, // 批内序号(1 起)
    pub duplicate_of: Option<usize>,
    #[serde(flatten)]
    pub result: ValidationResult,
}

// ==========================================
// ValidationSummary - 批量校验汇总
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub duplicate_count: usize,
}

// ==========================================
// BatchValidationReport - 批量校验报告
// ==========================================
// 分类: valid / invalid / duplicates(批内重复,独立计数)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchValidationReport {
    pub valid: Vec<IndexedValidation>,
    pub invalid: Vec<IndexedValidation>,
    pub duplicates: Vec<IndexedValidation>,
    pub summary: ValidationSummary,
}

// ==========================================
// DeviceRecord - 提取产物(提交批次内存实体)
// ==========================================
// 产生: 行提取器,每个含 IMEI 形值的数据行产出一条
// 归属: 所属提交批次,持久化前不落库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    // ===== IMEI =====
    pub imei: String,              // 重建后的 15 位数字串
    pub imei_raw: String,          // 原始单元格文本形式
    pub imei_source: CellKind,     // 来源单元格存储类型

    // ===== 描述字段(均可缺失)=====
    pub model: Option<String>,
    pub storage: Option<String>,
    pub condition: Option<String>,
    pub issue_description: Option<String>,
    pub issue_category: Option<String>,
    pub requested_action: Option<String>,
    pub unit_price: Option<f64>,
    pub repair_cost: Option<f64>,

    // ===== 元信息 =====
    pub row_number: usize, // 表格行号(0 起,含表头偏移)
    pub validation: ValidationResult,
}

// ==========================================
// Device - 持久化设备实体
// ==========================================
// 对齐: rma_devices 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub submission_id: i64,
    pub imei: String,
    pub imei_raw: String,
    pub imei_valid: bool,
    pub validation_errors: Option<String>,   // JSON 文本
    pub validation_warnings: Option<String>, // JSON 文本
    pub model: Option<String>,
    pub storage: Option<String>,
    pub condition: Option<String>,
    pub issue_description: Option<String>,
    pub issue_category: Option<String>,
    pub requested_action: Option<String>,
    pub unit_price: Option<f64>,
    pub repair_cost: Option<f64>,
    pub approval_status: ApprovalStatus,
    pub is_duplicate: bool,
    pub duplicate_override: bool,
    pub duplicate_override_reason: Option<String>,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// DuplicateCheckResult - 重复检测结果
// ==========================================
// 范围: 存活状态 + 90 天窗口内; 命中时返回既有记录引用,
//       供管理端展示覆写入口(检测为建议性,不阻断插入)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCheckResult {
    pub is_duplicate: bool,
    pub existing_device_id: Option<i64>,
    pub existing_submission_id: Option<i64>,
    pub existing_reference: Option<String>,
    pub existing_status: Option<ApprovalStatus>,
}

impl DuplicateCheckResult {
    pub fn not_duplicate() -> Self {
        Self {
            is_duplicate: false,
            existing_device_id: None,
            existing_submission_id: None,
            existing_reference: None,
            existing_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imei_error_serde_shape() {
        let json = serde_json::to_string(&ImeiError::WrongLength { found: 14 }).unwrap();
        assert!(json.contains("WRONG_LENGTH"));
        assert!(json.contains("14"));

        let back: ImeiError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ImeiError::WrongLength { found: 14 });
    }

    #[test]
    fn test_warning_display_is_informative() {
        let msg = ImeiWarning::ScientificNotation.to_string();
        assert!(msg.contains("科学计数法"));
    }
}
