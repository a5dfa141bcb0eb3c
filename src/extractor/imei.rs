// ==========================================
// 移动设备返修录入系统 - IMEI 重建器
// ==========================================
// 职责: 从有损数值编码中恢复全精度 15 位 IMEI
// 背景: 电子表格对超长整数静默舍入/转科学计数法,到达校验器时
//       已与故意短录入无法区分 —— 补偿逻辑只允许存在于本模块
// 红线: 科学计数法恢复信任全精度底层数值而非已截断的显示文本
// ==========================================

use crate::extractor::cell::{render_number, RawCell};

/// IMEI 标准长度
pub const IMEI_LEN: usize = 15;

/// 本系统校验策略要求的 IMEI 前缀
pub const IMEI_PREFIX: &str = "35";

/// 自动右补零的最短位数(低于 13 位不补,保持长度错误)
pub const PAD_FLOOR: usize = 13;

// "含五连零"精度丢失启发式的标记串
// 说明: 启发式判定,可能误报(本身多零的合法 IMEI)也可能漏报,
//       不做硬性保证,仅用于提示精确匹配不可信
const PRECISION_LOSS_MARK: &str = "00000";

// ==========================================
// Reconstructed - 重建结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstructed {
    pub digits: Option<String>,
    /// 底层数值表示在重建前即已丢失精度(启发式)
    pub precision_loss: bool,
}

impl Reconstructed {
    fn clean(digits: Option<String>) -> Self {
        Self {
            digits,
            precision_loss: false,
        }
    }
}

/// 去除所有非数字字符
pub fn strip_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 朴素清洗: 去非数字 + 13~14 位且 35 开头时右补零到 15 位
///
/// # 返回
/// - Some(String): 清洗后的数字串(长度不保证为 15)
/// - None: 去非数字后为空
pub fn clean_imei(value: &str) -> Option<String> {
    let mut digits = strip_digits(value);
    if digits.is_empty() {
        return None;
    }

    if (PAD_FLOOR..IMEI_LEN).contains(&digits.len()) && digits.starts_with(IMEI_PREFIX) {
        while digits.len() < IMEI_LEN {
            digits.push('0');
        }
    }

    Some(digits)
}

/// 科学计数法恢复(数值单元格路径): 以全精度 f64 渲染十进制并去小数点
///
/// # 判定顺序
/// 1. 恰好 15 位且 35 开头 → 直接接受
/// 2. 13~14 位且 35 开头 → 右补零到 15 位
/// 3. 其余: 候选串含五连零 → 标记精度丢失,值仍返回但不可用于精确匹配
pub fn reconstruct_scientific(value: f64) -> Reconstructed {
    let full = strip_digits(&render_number(value).replace('.', ""));

    if full.len() == IMEI_LEN && full.starts_with(IMEI_PREFIX) {
        return Reconstructed::clean(Some(full));
    }

    if (PAD_FLOOR..IMEI_LEN).contains(&full.len()) && full.starts_with(IMEI_PREFIX) {
        tracing::warn!(imei = %full, "IMEI 不足 15 位,右补零");
        return Reconstructed::clean(clean_imei(&full));
    }

    let precision_loss = full.contains(PRECISION_LOSS_MARK);
    if precision_loss {
        tracing::warn!(candidate = %full, "IMEI 疑似精度丢失(含五连零)");
    }

    Reconstructed {
        digits: clean_imei(&full),
        precision_loss,
    }
}

/// 科学计数法恢复(纯文本路径): 尾数/指数重建
///
/// 仅有文本形式("3.51454E+14")而无底层数值时的降级恢复:
/// 尾数去小数点后按指数补零,截断/右补到 15 位。
/// 精度上限受显示文本本身截断的限制,无法恢复被舍去的尾部数字。
pub fn reconstruct_scientific_text(text: &str) -> Option<String> {
    let lower = text.trim().to_lowercase();
    let (mantissa, exponent) = lower.split_once('e')?;

    let exp: i64 = exponent.trim().trim_start_matches('+').parse().ok()?;
    let mantissa_digits = strip_digits(mantissa);
    if mantissa_digits.is_empty() {
        return None;
    }

    // 3.51454E+14: 尾数 6 位,指数 14 → 总位数 15,需补 14-(6-1)=9 个零
    let zeros = exp - (mantissa_digits.len() as i64 - 1);
    let mut reconstructed = mantissa_digits;
    for _ in 0..zeros.max(0) {
        reconstructed.push('0');
    }

    if reconstructed.len() > IMEI_LEN {
        reconstructed.truncate(IMEI_LEN);
    } else {
        while reconstructed.len() < IMEI_LEN {
            reconstructed.push('0');
        }
    }

    Some(reconstructed)
}

/// 从单元格重建 IMEI(三类来源)
///
/// 1. 文本存储 → 朴素清洗(含指数标记的文本先走尾数重建)
/// 2. 数值存储且显示文本含指数标记 → 科学计数法恢复(信任全精度数值)
/// 3. 数值存储无指数 → 直接清洗显示文本(无显示文本时渲染原值)
pub fn extract_imei(cell: &RawCell) -> Reconstructed {
    match cell {
        RawCell::Text(s) => {
            if s.contains('E') || s.contains('e') {
                if let Some(rebuilt) = reconstruct_scientific_text(s) {
                    return Reconstructed::clean(Some(rebuilt));
                }
            }
            Reconstructed::clean(clean_imei(s))
        }
        RawCell::Number { value, display } => {
            if let Some(d) = display {
                if d.contains('E') || d.contains('e') {
                    return reconstruct_scientific(*value);
                }
                return Reconstructed::clean(clean_imei(d));
            }
            Reconstructed::clean(clean_imei(&render_number(*value)))
        }
        other => Reconstructed::clean(other.raw_text().as_deref().and_then(clean_imei)),
    }
}

/// 判定单元格值是否"IMEI 形"(行提取的纳入门槛)
///
/// 命中任一: 去非数字后恰 15 位且 35 开头; 含指数标记且以 "3.5" 开头;
/// 可解析为数值且整数部分 ≥14 位并以 35 开头
pub fn looks_like_imei(cell: &RawCell) -> bool {
    let Some(text) = cell.display_text() else {
        return false;
    };

    let digits = strip_digits(&text);
    if digits.len() == IMEI_LEN && digits.starts_with(IMEI_PREFIX) {
        return true;
    }

    if (text.contains('E') || text.contains('e')) && text.starts_with("3.5") {
        return true;
    }

    let numeric = cell.as_number().or_else(|| text.trim().parse::<f64>().ok());
    if let Some(v) = numeric {
        let int_digits = format!("{:.0}", v.abs().floor());
        if int_digits.len() >= IMEI_LEN - 1 && int_digits.starts_with(IMEI_PREFIX) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_imei_passthrough() {
        assert_eq!(
            clean_imei("351454482579210"),
            Some("351454482579210".to_string())
        );
    }

    #[test]
    fn test_clean_imei_strips_formatting() {
        assert_eq!(
            clean_imei("35-1454-482579-210"),
            Some("351454482579210".to_string())
        );
    }

    #[test]
    fn test_clean_imei_pads_13_digit_band() {
        // 13 位且 35 开头 → 右补零到 15
        assert_eq!(
            clean_imei("3514544825792"),
            Some("351454482579200".to_string())
        );
    }

    #[test]
    fn test_clean_imei_below_pad_floor_unchanged() {
        // 12 位低于补零下限,保持原长(后续报长度错误)
        assert_eq!(clean_imei("351454482579"), Some("351454482579".to_string()));
    }

    #[test]
    fn test_clean_imei_wrong_prefix_not_padded() {
        assert_eq!(
            clean_imei("12345678901234"),
            Some("12345678901234".to_string())
        );
    }

    #[test]
    fn test_reconstruct_scientific_exact() {
        // 全精度数值可精确恢复(显示文本只剩 3.51454E+14 也不受影响)
        let r = reconstruct_scientific(351454482579210.0);
        assert_eq!(r.digits, Some("351454482579210".to_string()));
        assert!(!r.precision_loss);
    }

    #[test]
    fn test_reconstruct_scientific_flags_precision_loss() {
        // 底层数值本身已被舍入(尾部大段零) → 标记精度丢失,值仍返回
        let r = reconstruct_scientific(351454000000000.0);
        assert_eq!(r.digits, Some("351454000000000".to_string()));
        assert!(r.precision_loss);
    }

    #[test]
    fn test_reconstruct_scientific_text_mantissa_path() {
        assert_eq!(
            reconstruct_scientific_text("3.51454E+14"),
            Some("351454000000000".to_string())
        );
        assert_eq!(
            reconstruct_scientific_text("3.5145448257921e14"),
            Some("351454482579210".to_string())
        );
    }

    #[test]
    fn test_extract_imei_number_with_sci_display() {
        let cell = RawCell::number_with_display(351454482579210.0, "3.51454E+14");
        let r = extract_imei(&cell);
        assert_eq!(r.digits, Some("351454482579210".to_string()));
        assert!(!r.precision_loss);
    }

    #[test]
    fn test_extract_imei_text_cell() {
        let r = extract_imei(&RawCell::text("351454482579210"));
        assert_eq!(r.digits, Some("351454482579210".to_string()));
    }

    #[test]
    fn test_extract_imei_scientific_text_cell() {
        // 纯文本科学计数法(CSV 路径)走尾数重建而非朴素清洗
        let r = extract_imei(&RawCell::text("3.51454E+14"));
        assert_eq!(r.digits, Some("351454000000000".to_string()));
    }

    #[test]
    fn test_extract_imei_plain_number() {
        let r = extract_imei(&RawCell::number(351454482579210.0));
        assert_eq!(r.digits, Some("351454482579210".to_string()));
    }

    #[test]
    fn test_looks_like_imei() {
        assert!(looks_like_imei(&RawCell::text("351454482579210")));
        assert!(looks_like_imei(&RawCell::text("3.51454E+14")));
        assert!(looks_like_imei(&RawCell::number(351454482579210.0)));
        // 非 35 前缀的 14 位数不具 IMEI 形
        assert!(!looks_like_imei(&RawCell::text("12345678901234")));
        assert!(!looks_like_imei(&RawCell::text("iPhone 12")));
        assert!(!looks_like_imei(&RawCell::Empty));
    }
}
