// ==========================================
// 移动设备返修录入系统 - 行提取器
// ==========================================
// 职责: 沿列映射遍历表头以下的数据行,每个含 IMEI 形值的行
//       产出一条候选设备记录(附校验结果)
// 红线: 单行校验失败从不中断提取 —— 无效行也产出记录供人工复核,
//       仅无 IMEI 形值的行被静默跳过
// ==========================================

use crate::domain::device::DeviceRecord;
use crate::domain::types::CanonicalField;
use crate::extractor::cell::RawCell;
use crate::extractor::header_mapper::HeaderInfo;
use crate::extractor::imei::{extract_imei, looks_like_imei};
use crate::extractor::validator::ImeiValidator;

static EMPTY_CELL: RawCell = RawCell::Empty;

pub struct RowExtractor;

impl RowExtractor {
    /// 从表头下一行起提取全部候选设备记录
    pub fn extract_rows(grid: &[Vec<RawCell>], header: &HeaderInfo) -> Vec<DeviceRecord> {
        let mut records = Vec::new();

        for (offset, row) in grid.iter().enumerate().skip(header.data_start_row()) {
            if let Some(record) = Self::extract_row(row, header, offset) {
                tracing::debug!(
                    row = offset,
                    imei = %record.imei,
                    valid = record.validation.is_valid,
                    "提取设备记录"
                );
                records.push(record);
            }
        }

        records
    }

    /// 提取单行; 无 IMEI 形值的行返回 None(静默跳过)
    fn extract_row(row: &[RawCell], header: &HeaderInfo, row_number: usize) -> Option<DeviceRecord> {
        let imei_cell = cell_at(row, header.columns.imei_column());
        if !looks_like_imei(imei_cell) {
            return None;
        }

        let reconstructed = extract_imei(imei_cell);
        let imei = reconstructed.digits?;
        let validation = ImeiValidator::validate(imei_cell);

        let mut record = DeviceRecord {
            imei,
            imei_raw: imei_cell.display_text().unwrap_or_default(),
            imei_source: imei_cell.kind(),
            model: None,
            storage: None,
            condition: None,
            issue_description: None,
            issue_category: None,
            requested_action: None,
            unit_price: None,
            repair_cost: None,
            row_number,
            validation,
        };

        for (field, col) in header.columns.iter() {
            let cell = cell_at(row, col);
            match field {
                CanonicalField::Imei => {}
                CanonicalField::Model => record.model = text_field(cell),
                CanonicalField::Storage => record.storage = text_field(cell),
                CanonicalField::Condition => record.condition = text_field(cell),
                CanonicalField::IssueDescription => record.issue_description = text_field(cell),
                CanonicalField::IssueCategory => record.issue_category = text_field(cell),
                CanonicalField::RequestedAction => record.requested_action = text_field(cell),
                CanonicalField::UnitPrice => record.unit_price = price_field(cell),
                CanonicalField::RepairCost => record.repair_cost = price_field(cell),
            }
        }

        Some(record)
    }
}

fn cell_at(row: &[RawCell], index: usize) -> &RawCell {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

/// 描述性字段: 显示文本去空白,空值归 None
fn text_field(cell: &RawCell) -> Option<String> {
    cell.display_text()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 价格字段: 去除美元符与千分位逗号后解析为数值
fn price_field(cell: &RawCell) -> Option<f64> {
    if let Some(v) = cell.as_number() {
        return Some(v);
    }
    let text = cell.display_text()?;
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
