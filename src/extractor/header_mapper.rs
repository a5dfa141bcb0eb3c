// ==========================================
// 移动设备返修录入系统 - 表头/列映射器
// ==========================================
// 职责: 在表格顶部定位含 IMEI 列的表头行,将其余表头
//       模糊匹配到规范字段字典,构建 列序号→字段 映射
// 红线: 纯函数,只依赖普通单元格网格,不依赖任何表格库类型
// 已知限制: 可同时命中两个字段的歧义表头归属字典顺序靠前者,
//           裁决确定但本质任意,调用方不得依赖具体归属
// ==========================================

use crate::domain::types::CanonicalField;
use crate::extractor::cell::RawCell;
use std::collections::HashMap;

/// 表头扫描窗口: 最多扫描前 20 行,超出即判定无表头
pub const HEADER_SCAN_ROWS: usize = 20;

/// 规范字段的可接受表头别名(全小写)
pub fn aliases(field: CanonicalField) -> &'static [&'static str] {
    match field {
        CanonicalField::Imei => &["imei", "imei number", "imei#", "serial", "serial number"],
        CanonicalField::Model => &["model", "device model", "phone model", "device"],
        CanonicalField::Storage => &["storage", "capacity", "size", "gb", "storage size"],
        CanonicalField::Condition => {
            &["grade", "condition", "device condition", "quality", "grading"]
        }
        CanonicalField::IssueDescription => {
            &["issue", "problem", "issue description", "defect", "reason"]
        }
        CanonicalField::IssueCategory => {
            &["issue category", "category", "issue type", "problem type"]
        }
        CanonicalField::RequestedAction => &[
            "repair/return",
            "action",
            "repair or return",
            "request",
            "requested action",
        ],
        CanonicalField::UnitPrice => &["unit price", "price", "value", "cost", "device price"],
        CanonicalField::RepairCost => &[
            "repair cost",
            "repair cost (if applicable)",
            "cost of repair",
            "repair price",
        ],
    }
}

// ==========================================
// ColumnMap - 规范字段 → 列序号映射
// ==========================================
// 构建后不可变; IMEI 字段缺失的映射视为无效(提取失败)
#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: HashMap<CanonicalField, usize>,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// IMEI 列序号(HeaderInfo 的构建保证存在)
    pub fn imei_column(&self) -> usize {
        self.columns[&CanonicalField::Imei]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, usize)> + '_ {
        self.columns.iter().map(|(f, c)| (*f, *c))
    }
}

// ==========================================
// HeaderInfo - 表头定位结果
// ==========================================
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub row_index: usize, // 表头行号(0 起)
    pub columns: ColumnMap,
}

impl HeaderInfo {
    /// 数据起始行(表头下一行)
    pub fn data_start_row(&self) -> usize {
        self.row_index + 1
    }
}

/// 单个表头文本与别名表的三档匹配: 精确 > 前缀 > 包含
fn matches_field(header: &str, field: CanonicalField) -> bool {
    let names = aliases(field);

    if names.iter().any(|n| header == *n) {
        return true;
    }
    if names.iter().any(|n| header.starts_with(n)) {
        return true;
    }
    names.iter().any(|n| header.contains(n))
}

/// 在网格顶部定位表头行
///
/// # 算法
/// - 逐行扫描(至多 scan_rows 行): 每个单元格取显示文本小写去空白,
///   按字典顺序对未认领字段做三档匹配,首个命中字段认领该列
/// - 某行命中 IMEI 字段即接受该行为表头(该行其余列继续累积映射,
///   扫描在首个合格行停止,不回扫寻找"更优"映射)
///
/// # 返回
/// - Some(HeaderInfo): 定位成功
/// - None: 窗口内无任何行产生 IMEI 列匹配
pub fn find_header_row(grid: &[Vec<RawCell>], scan_rows: usize) -> Option<HeaderInfo> {
    for (row_index, row) in grid.iter().take(scan_rows).enumerate() {
        let mut columns: HashMap<CanonicalField, usize> = HashMap::new();
        let mut found_imei = false;

        for (col_index, cell) in row.iter().enumerate() {
            let Some(text) = cell.display_text() else {
                continue;
            };
            let header = text.trim().to_lowercase();
            if header.is_empty() {
                continue;
            }

            for field in CanonicalField::ALL {
                // 已认领字段不再参与
                if columns.contains_key(&field) {
                    continue;
                }
                if matches_field(&header, field) {
                    columns.insert(field, col_index);
                    if field == CanonicalField::Imei {
                        found_imei = true;
                    }
                    break;
                }
            }
        }

        if found_imei {
            tracing::debug!(row = row_index, mapped = columns.len(), "表头行定位成功");
            return Some(HeaderInfo {
                row_index,
                columns: ColumnMap { columns },
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<RawCell> {
        cells
            .iter()
            .map(|s| {
                if s.is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::text(*s)
                }
            })
            .collect()
    }

    #[test]
    fn test_finds_header_on_first_row() {
        let grid = vec![
            text_row(&["IMEI", "Model", "Storage", "Grade"]),
            text_row(&["351454482579210", "iPhone 12", "128GB", "A"]),
        ];
        let info = find_header_row(&grid, HEADER_SCAN_ROWS).unwrap();
        assert_eq!(info.row_index, 0);
        assert_eq!(info.columns.get(CanonicalField::Imei), Some(0));
        assert_eq!(info.columns.get(CanonicalField::Model), Some(1));
        assert_eq!(info.columns.get(CanonicalField::Storage), Some(2));
        assert_eq!(info.columns.get(CanonicalField::Condition), Some(3));
    }

    #[test]
    fn test_skips_preamble_rows() {
        let grid = vec![
            text_row(&["ACME 回收清单", "", ""]),
            text_row(&["Date: 2025-11-01", "", ""]),
            text_row(&["IMEI Number", "Device Model", "Unit Price"]),
            text_row(&["351454482579210", "Pixel 8", "$250"]),
        ];
        let info = find_header_row(&grid, HEADER_SCAN_ROWS).unwrap();
        assert_eq!(info.row_index, 2);
        assert_eq!(info.data_start_row(), 3);
        assert_eq!(info.columns.get(CanonicalField::UnitPrice), Some(2));
    }

    #[test]
    fn test_prefix_and_contains_matching() {
        // "serial no." 前缀命中 "serial"; "grading notes" 前缀命中 "grading"
        let grid = vec![text_row(&["Serial No.", "Grading Notes"])];
        let info = find_header_row(&grid, HEADER_SCAN_ROWS).unwrap();
        assert_eq!(info.columns.get(CanonicalField::Imei), Some(0));
        assert_eq!(info.columns.get(CanonicalField::Condition), Some(1));
    }

    #[test]
    fn test_no_imei_column_means_no_header() {
        let grid = vec![
            text_row(&["Model", "Storage", "Price"]),
            text_row(&["iPhone", "64GB", "100"]),
        ];
        assert!(find_header_row(&grid, HEADER_SCAN_ROWS).is_none());
    }

    #[test]
    fn test_header_beyond_scan_window_not_found() {
        // 表头在第 21 行(序号 20),超出 20 行窗口
        let mut grid: Vec<Vec<RawCell>> = (0..20).map(|_| text_row(&["note", ""])).collect();
        grid.push(text_row(&["IMEI", "Model"]));
        assert!(find_header_row(&grid, HEADER_SCAN_ROWS).is_none());

        // 恰在窗口内(序号 19)则可定位
        let mut grid: Vec<Vec<RawCell>> = (0..19).map(|_| text_row(&["note", ""])).collect();
        grid.push(text_row(&["IMEI", "Model"]));
        let info = find_header_row(&grid, HEADER_SCAN_ROWS).unwrap();
        assert_eq!(info.row_index, 19);
    }

    #[test]
    fn test_first_qualifying_row_wins() {
        // 第一个含 IMEI 匹配的行被接受,即使后续行映射更全
        let grid = vec![
            text_row(&["serial", ""]),
            text_row(&["imei", "model", "storage"]),
        ];
        let info = find_header_row(&grid, HEADER_SCAN_ROWS).unwrap();
        assert_eq!(info.row_index, 0);
        assert_eq!(info.columns.len(), 1);
    }

    #[test]
    fn test_claimed_field_not_reassigned() {
        // 两列都可命中 IMEI 别名,首列认领后次列落到下一个可匹配字段
        let grid = vec![text_row(&["imei", "serial number of device"])];
        let info = find_header_row(&grid, HEADER_SCAN_ROWS).unwrap();
        assert_eq!(info.columns.get(CanonicalField::Imei), Some(0));
        // "serial number of device" 不再匹配已认领的 imei 字段
        assert_ne!(info.columns.get(CanonicalField::Model), Some(0));
    }

    #[test]
    fn test_ambiguous_header_resolves_in_dictionary_order() {
        // "size" 同时是 storage 别名且包含于无他字段 → 归 storage
        // "cost" 既含于 unit_price 别名也含于 repair_cost → 归字典序靠前的 unit_price
        let grid = vec![text_row(&["imei", "cost"])];
        let info = find_header_row(&grid, HEADER_SCAN_ROWS).unwrap();
        assert_eq!(info.columns.get(CanonicalField::UnitPrice), Some(1));
        assert_eq!(info.columns.get(CanonicalField::RepairCost), None);
    }
}
