// ==========================================
// 移动设备返修录入系统 - 单元格读取器
// ==========================================
// 职责: 单元格最优文本/数值表示(显示值 + 底层原值 + 类型标签)
// 契约: 永不失败; 缺失单元格与空单元格同等处理
// ==========================================

use crate::domain::types::CellKind;
use calamine::Data;

// ==========================================
// RawCell - 单元格原始值
// ==========================================
// 瞬态结构,每次读取产生,不持久化
// Number.display: 电子表格缓存的格式化文本(科学计数法损坏即发生于此)
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number { value: f64, display: Option<String> },
    Bool(bool),
    Error(String),
}

impl RawCell {
    pub fn text(s: impl Into<String>) -> Self {
        RawCell::Text(s.into())
    }

    pub fn number(value: f64) -> Self {
        RawCell::Number {
            value,
            display: None,
        }
    }

    pub fn number_with_display(value: f64, display: impl Into<String>) -> Self {
        RawCell::Number {
            value,
            display: Some(display.into()),
        }
    }

    pub fn kind(&self) -> CellKind {
        match self {
            RawCell::Empty => CellKind::Empty,
            RawCell::Text(_) => CellKind::Text,
            RawCell::Number { .. } => CellKind::Number,
            RawCell::Bool(_) => CellKind::Bool,
            RawCell::Error(_) => CellKind::Error,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }

    /// 显示优先的文本表示: 有格式化显示值用显示值,否则用原值,空单元格为 None
    pub fn display_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => Some(s.clone()),
            RawCell::Number { value, display } => display
                .clone()
                .or_else(|| Some(render_number(*value))),
            RawCell::Bool(b) => Some(if *b { "TRUE".into() } else { "FALSE".into() }),
            RawCell::Error(e) => Some(e.clone()),
        }
    }

    /// 底层原值的文本表示(数值单元格渲染全精度十进制,不走显示值)
    pub fn raw_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => Some(s.clone()),
            RawCell::Number { value, .. } => Some(render_number(*value)),
            RawCell::Bool(b) => Some(if *b { "TRUE".into() } else { "FALSE".into() }),
            RawCell::Error(e) => Some(e.clone()),
        }
    }

    /// 底层数值(仅数值单元格)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawCell::Number { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// f64 的全精度十进制渲染(整数值不带小数部分,永不输出指数形式)
pub fn render_number(value: f64) -> String {
    format!("{}", value)
}

// calamine 单元格 → RawCell
// 说明: calamine 返回的是解析后的缓存值,浮点单元格不附带显示文本;
//       科学计数法显示文本主要来自 CSV 文本单元格与内存网格
impl From<&Data> for RawCell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => RawCell::Empty,
            Data::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::Text(trimmed.to_string())
                }
            }
            Data::Float(f) => RawCell::number(*f),
            Data::Int(i) => RawCell::number(*i as f64),
            Data::Bool(b) => RawCell::Bool(*b),
            Data::Error(e) => RawCell::Error(format!("{:?}", e)),
            Data::DateTime(dt) => RawCell::number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        }
    }
}
