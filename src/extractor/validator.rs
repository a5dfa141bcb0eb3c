// ==========================================
// 移动设备返修录入系统 - IMEI 校验器
// ==========================================
// 职责: 任意形态原值(数值/数字串/科学计数法文本/空) → ValidationResult
// 规则: 各项独立评估,全部报告; is_valid ⇔ errors 为空
// 红线: 有效性与"有警告"正交 —— 有效带警告可自动接收(标记复核),
//       无效阻断自动审批并转人工
// ==========================================

use crate::domain::device::{
    BatchValidationReport, ImeiError, ImeiWarning, IndexedValidation, ValidationResult,
    ValidationSummary,
};
use crate::extractor::cell::{render_number, RawCell};
use crate::extractor::imei::{
    clean_imei, reconstruct_scientific, reconstruct_scientific_text, strip_digits, IMEI_LEN,
    IMEI_PREFIX,
};
use std::collections::HashMap;

pub struct ImeiValidator;

impl ImeiValidator {
    /// 清洗: 显示文本含指数标记的数值单元格走全精度科学计数法恢复,
    /// 纯文本含指数标记走尾数/指数重建,其余走朴素清洗(含 13~14 位补零)
    pub fn sanitize(cell: &RawCell) -> Option<String> {
        Self::sanitize_with_loss(cell).0
    }

    fn sanitize_with_loss(cell: &RawCell) -> (Option<String>, bool) {
        match cell {
            RawCell::Number { value, display } => {
                if let Some(d) = display {
                    if d.contains('E') || d.contains('e') {
                        let r = reconstruct_scientific(*value);
                        return (r.digits, r.precision_loss);
                    }
                    // 非指数显示文本优先,与重建器同口径
                    return (clean_imei(d), false);
                }
                (clean_imei(&render_number(*value)), false)
            }
            _ => {
                let Some(text) = cell.raw_text() else {
                    return (None, false);
                };
                if text.contains('E') || text.contains('e') {
                    let rebuilt =
                        reconstruct_scientific_text(&text).or_else(|| clean_imei(&text));
                    return (rebuilt, false);
                }
                (clean_imei(&text), false)
            }
        }
    }

    /// 校验单个 IMEI
    ///
    /// # 返回
    /// - ValidationResult: sanitized 无论有效与否均已计算(供复核工具展示)
    ///
    /// # 说明
    /// - 纯函数,无隐藏状态,同一输入两次调用结果一致
    pub fn validate(cell: &RawCell) -> ValidationResult {
        let display_form = cell.display_text();
        let raw_form = cell.raw_text();
        let (sanitized, precision_loss) = Self::sanitize_with_loss(cell);

        let mut result = ValidationResult {
            original: display_form.clone(),
            sanitized: sanitized.clone(),
            is_valid: false,
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        let Some(sanitized) = sanitized.filter(|s| !s.is_empty()) else {
            result.errors.push(ImeiError::Empty);
            return result;
        };

        if sanitized.len() != IMEI_LEN {
            result.errors.push(ImeiError::WrongLength {
                found: sanitized.len(),
            });
        }

        if !sanitized.starts_with(IMEI_PREFIX) {
            result.errors.push(ImeiError::WrongPrefix);
        }

        if !sanitized.chars().all(|c| c.is_ascii_digit()) {
            result.errors.push(ImeiError::NonDigit);
        }

        // ===== 警告(不阻断)=====
        // 科学计数法按显示/原值任一形式含指数标记判定
        let has_exponent = |s: &Option<String>| {
            s.as_deref()
                .map(|t| t.contains('E') || t.contains('e'))
                .unwrap_or(false)
        };
        if has_exponent(&display_form) || has_exponent(&raw_form) {
            result.warnings.push(ImeiWarning::ScientificNotation);
        }

        // 小数点/清洗判定针对底层原值的文本形式
        // 清洗警告: 仅当补零/重建等实质改写了数字序列时触发,
        // 纯分隔符去除(去非数字后即为清洗结果)不计
        if let Some(raw) = &raw_form {
            if raw.contains('.') {
                result.warnings.push(ImeiWarning::DecimalPoint);
            }
            if sanitized != strip_digits(raw) {
                result.warnings.push(ImeiWarning::CleanedFromFormatting);
            }
        }

        if precision_loss {
            result.warnings.push(ImeiWarning::PrecisionLoss);
        }

        result.is_valid = result.errors.is_empty();
        result
    }

    /// 文本原值便捷入口(表单/CSV 路径)
    pub fn validate_text(value: &str) -> ValidationResult {
        if value.trim().is_empty() {
            Self::validate(&RawCell::Empty)
        } else {
            Self::validate(&RawCell::text(value.trim()))
        }
    }

    /// 批量校验
    ///
    /// 批内重复: 已有有效 IMEI 再次出现时重分类为批内重复,
    /// 归入 duplicates 并独立计数,不污染单条有效性
    pub fn validate_batch(cells: &[RawCell]) -> BatchValidationReport {
        let mut report = BatchValidationReport {
            valid: Vec::new(),
            invalid: Vec::new(),
            duplicates: Vec::new(),
            summary: ValidationSummary {
                total: cells.len(),
                ..ValidationSummary::default()
            },
        };

        let mut first_seen: HashMap<String, usize> = HashMap::new();

        for (i, cell) in cells.iter().enumerate() {
            let index = i + 1;
            let result = Self::validate(cell);

            if !result.is_valid {
                report.summary.invalid_count += 1;
                report.invalid.push(IndexedValidation {
                    index,
                    duplicate_of: None,
                    result,
                });
                continue;
            }

            // is_valid 保证 sanitized 存在
            let key = result.sanitized.clone().unwrap_or_default();
            if let Some(&first) = first_seen.get(&key) {
                report.summary.duplicate_count += 1;
                report.duplicates.push(IndexedValidation {
                    index,
                    duplicate_of: Some(first),
                    result,
                });
            } else {
                first_seen.insert(key, index);
                report.summary.valid_count += 1;
                report.valid.push(IndexedValidation {
                    index,
                    duplicate_of: None,
                    result,
                });
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::imei::extract_imei;

    #[test]
    fn test_valid_15_digit_text_no_warnings() {
        let r = ImeiValidator::validate(&RawCell::text("351454482579210"));
        assert!(r.is_valid);
        assert!(r.errors.is_empty());
        assert!(r.warnings.is_empty());
        assert_eq!(r.sanitized, Some("351454482579210".to_string()));
    }

    #[test]
    fn test_scientific_number_cell_recovers_exact_with_one_warning() {
        // 数值单元格 + 科学计数法显示: 全精度恢复,仅科学计数法一条警告
        let cell = RawCell::number_with_display(351454482579210.0, "3.51454E+14");
        let r = ImeiValidator::validate(&cell);
        assert!(r.is_valid);
        assert_eq!(r.sanitized, Some("351454482579210".to_string()));
        assert_eq!(r.warnings, vec![ImeiWarning::ScientificNotation]);
    }

    #[test]
    fn test_scientific_text_only_degrades_but_validates() {
        // 仅有截断后的显示文本时走尾数重建,附带全部格式警告
        let r = ImeiValidator::validate(&RawCell::text("3.51454E+14"));
        assert!(r.is_valid);
        assert_eq!(r.sanitized, Some("351454000000000".to_string()));
        assert!(r.warnings.contains(&ImeiWarning::ScientificNotation));
        assert!(r.warnings.contains(&ImeiWarning::DecimalPoint));
        assert!(r.warnings.contains(&ImeiWarning::CleanedFromFormatting));
    }

    #[test]
    fn test_dash_formatted_imei_strips_without_cleaned_warning() {
        // 纯分隔符去除: 去非数字后即为清洗结果,不计清洗警告
        let r = ImeiValidator::validate(&RawCell::text("35-1454-482579-210"));
        assert!(r.is_valid);
        assert_eq!(r.sanitized, Some("351454482579210".to_string()));
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_number_cell_display_takes_priority_over_raw() {
        // 数值单元格无指数显示: 以格式化显示文本为准,与重建器同口径
        let cell = RawCell::number_with_display(35145448257921.5, "35145448257922");
        let r = ImeiValidator::validate(&cell);
        assert_eq!(r.sanitized, Some("351454482579220".to_string()));
        assert_eq!(r.sanitized, extract_imei(&cell).digits);
        assert!(r.is_valid);
    }

    #[test]
    fn test_wrong_prefix_and_length_both_reported() {
        let r = ImeiValidator::validate(&RawCell::text("12345678901234"));
        assert!(!r.is_valid);
        assert!(r
            .errors
            .iter()
            .any(|e| matches!(e, ImeiError::WrongLength { found: 14 })));
        assert!(r.errors.contains(&ImeiError::WrongPrefix));
    }

    #[test]
    fn test_empty_cell_reports_empty() {
        let r = ImeiValidator::validate(&RawCell::Empty);
        assert!(!r.is_valid);
        assert_eq!(r.errors, vec![ImeiError::Empty]);
        assert_eq!(r.sanitized, None);
    }

    #[test]
    fn test_12_digits_below_pad_floor_stays_length_error() {
        // 12 位低于 13 位补零下限 → 保持长度错误,不自动补位
        let r = ImeiValidator::validate(&RawCell::text("351454482579"));
        assert!(!r.is_valid);
        assert!(r
            .errors
            .iter()
            .any(|e| matches!(e, ImeiError::WrongLength { found: 12 })));
    }

    #[test]
    fn test_14_digit_padded_band_is_valid_with_cleaned_warning() {
        let r = ImeiValidator::validate(&RawCell::text("35145448257921"));
        assert!(r.is_valid);
        assert_eq!(r.sanitized, Some("351454482579210".to_string()));
        assert!(r.warnings.contains(&ImeiWarning::CleanedFromFormatting));
    }

    #[test]
    fn test_overlong_imei_reports_length_error() {
        // 朴素清洗路径不截断,19 位按长度错误上报
        let r = ImeiValidator::validate(&RawCell::text("3514544825792101234"));
        assert!(!r.is_valid);
        assert!(r
            .errors
            .iter()
            .any(|e| matches!(e, ImeiError::WrongLength { found: 19 })));
    }

    #[test]
    fn test_letter_contamination_cleaned_then_length_checked() {
        let r = ImeiValidator::validate(&RawCell::text("35145448257921A"));
        // 去掉字母后剩 14 位,落入补零带 → 有效但带清洗警告
        assert!(r.is_valid);
        assert!(r.warnings.contains(&ImeiWarning::CleanedFromFormatting));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let cell = RawCell::number_with_display(351454482579210.0, "3.51454E+14");
        let a = ImeiValidator::validate(&cell);
        let b = ImeiValidator::validate(&cell);
        assert_eq!(a, b);
    }

    #[test]
    fn test_precision_loss_warning_from_number_cell() {
        let cell = RawCell::number_with_display(351454000000000.0, "3.51454E+14");
        let r = ImeiValidator::validate(&cell);
        assert!(r.is_valid);
        assert!(r.warnings.contains(&ImeiWarning::PrecisionLoss));
    }

    #[test]
    fn test_batch_duplicate_reclassified() {
        let cells = vec![
            RawCell::text("351454482579210"),
            RawCell::text("357068940352541"),
            RawCell::text("351454482579210"), // 批内重复
            RawCell::text("12345678901234"),  // 无效
        ];
        let report = ImeiValidator::validate_batch(&cells);

        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.valid_count, 2);
        assert_eq!(report.summary.invalid_count, 1);
        assert_eq!(report.summary.duplicate_count, 1);

        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].index, 3);
        assert_eq!(report.duplicates[0].duplicate_of, Some(1));
        // 重分类不改变单条有效性
        assert!(report.duplicates[0].result.is_valid);
    }

    #[test]
    fn test_validate_text_blank_is_empty() {
        let r = ImeiValidator::validate_text("   ");
        assert_eq!(r.errors, vec![ImeiError::Empty]);
    }
}
