// ==========================================
// 移动设备返修录入系统 - 设备提取器（文件入口）
// ==========================================
// 职责: 文件 → 单元格网格 → 表头定位 → 行提取 → 提取结果
// 支持: Excel (.xlsx/.xls) / CSV (.csv),按扩展名自动选择
// 红线: 表头定位失败是结构性失败(整文件拒收),
//       单行校验失败不是(无效记录照常进入结果)
// ==========================================

use crate::extractor::cell::RawCell;
use crate::extractor::error::{ExtractError, ExtractResult};
use crate::extractor::header_mapper::{find_header_row, HeaderInfo, HEADER_SCAN_ROWS};
use crate::extractor::row_extractor::RowExtractor;
use crate::domain::device::DeviceRecord;
use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// ExtractionReport - 单文件提取结果
// ==========================================
#[derive(Debug)]
pub struct ExtractionReport {
    pub header: HeaderInfo,
    pub records: Vec<DeviceRecord>,
    /// 网格总行数(含表头与被跳过的行)
    pub total_rows: usize,
}

impl ExtractionReport {
    pub fn valid_count(&self) -> usize {
        self.records.iter().filter(|r| r.validation.is_valid).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.records.len() - self.valid_count()
    }
}

// ==========================================
// DeviceExtractor - 提取流程编排
// ==========================================
pub struct DeviceExtractor {
    scan_rows: usize,
}

impl Default for DeviceExtractor {
    fn default() -> Self {
        Self {
            scan_rows: HEADER_SCAN_ROWS,
        }
    }
}

impl DeviceExtractor {
    pub fn new(scan_rows: usize) -> Self {
        Self { scan_rows }
    }

    /// 从文件提取设备记录(按扩展名分派)
    pub fn extract_from_file<P: AsRef<Path>>(&self, file_path: P) -> ExtractResult<ExtractionReport> {
        let path = file_path.as_ref();

        if !path.exists() {
            return Err(ExtractError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let grid = match ext.as_str() {
            "xlsx" | "xls" => read_excel_grid(path)?,
            "csv" => read_csv_grid(path)?,
            _ => return Err(ExtractError::UnsupportedFormat(ext)),
        };

        tracing::info!(file = %path.display(), rows = grid.len(), "文件读取完成");
        self.extract_from_grid(&grid)
    }

    /// 从内存网格提取(表单粘贴/测试路径)
    pub fn extract_from_grid(&self, grid: &[Vec<RawCell>]) -> ExtractResult<ExtractionReport> {
        let header = find_header_row(grid, self.scan_rows).ok_or(ExtractError::NoHeaderFound {
            scanned: self.scan_rows.min(grid.len()),
        })?;

        let records = RowExtractor::extract_rows(grid, &header);
        tracing::info!(
            header_row = header.row_index,
            mapped_columns = header.columns.len(),
            records = records.len(),
            "提取完成"
        );

        Ok(ExtractionReport {
            header,
            records,
            total_rows: grid.len(),
        })
    }
}

/// 读取 Excel 第一个工作表为单元格网格
fn read_excel_grid(path: &Path) -> ExtractResult<Vec<Vec<RawCell>>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| ExtractError::ExcelParseError("Excel 文件无工作表".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let grid = range
        .rows()
        .map(|row| row.iter().map(RawCell::from).collect())
        .collect();

    Ok(grid)
}

/// 读取 CSV 为文本单元格网格
///
/// CSV 一律按文本读取,不做表头假设(表头定位交给扫描窗口);
/// 科学计数法损坏值在此路径以截断文本形式到达
fn read_csv_grid(path: &Path) -> ExtractResult<Vec<Vec<RawCell>>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // 允许行长度不一致
        .from_reader(file);

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: Vec<RawCell> = record
            .iter()
            .map(|v| {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::text(trimmed)
                }
            })
            .collect();
        grid.push(row);
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(lines: &[&str]) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_extract_from_csv_file() {
        let f = csv_file(&[
            "IMEI,Model,Unit Price",
            "351454482579210,iPhone 12,$250",
            "357068940352541,Pixel 8,$199",
        ]);

        let report = DeviceExtractor::default().extract_from_file(f.path()).unwrap();
        assert_eq!(report.header.row_index, 0);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.valid_count(), 2);
        assert_eq!(report.records[1].unit_price, Some(199.0));
    }

    #[test]
    fn test_csv_with_preamble_and_truncated_scientific() {
        let f = csv_file(&[
            "ACME Returns Export,,",
            "IMEI,Model,Grade",
            "3.51454E+14,Galaxy S22,B",
        ]);

        let report = DeviceExtractor::default().extract_from_file(f.path()).unwrap();
        assert_eq!(report.header.row_index, 1);
        assert_eq!(report.records.len(), 1);
        // 文本路径只能走尾数重建,精确位无法恢复
        assert_eq!(report.records[0].imei, "351454000000000");
        assert!(report.records[0].validation.has_warnings());
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let err = DeviceExtractor::default()
            .extract_from_file("no_such_file.csv")
            .unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        let err = DeviceExtractor::default()
            .extract_from_file(f.path())
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_no_header_is_structural_failure() {
        let f = csv_file(&["Model,Price", "iPhone,100"]);
        let err = DeviceExtractor::default()
            .extract_from_file(f.path())
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoHeaderFound { .. }));
    }

    #[test]
    fn test_extract_from_grid_counts() {
        let grid = vec![
            vec![RawCell::text("imei"), RawCell::text("model")],
            vec![RawCell::text("351454482579210"), RawCell::text("iPhone")],
            vec![RawCell::text("35145448257992101234"), RawCell::Empty],
        ];
        let report = DeviceExtractor::default().extract_from_grid(&grid).unwrap();
        // 20 位串去非数字后非 15 位、整数部分虽 35 开头 → 仍满足数值门槛进入记录
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.valid_count(), 1);
    }
}
