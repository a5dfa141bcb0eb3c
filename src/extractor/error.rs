// ==========================================
// 移动设备返修录入系统 - 提取模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 提取模块错误类型
#[derive(Error, Debug)]
pub enum ExtractError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 结构性失败 =====
    #[error("前 {scanned} 行内未定位到含 IMEI 列的表头行")]
    NoHeaderFound { scanned: usize },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        ExtractError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ExtractError {
    fn from(err: csv::Error) -> Self {
        ExtractError::CsvParseError(err.to_string())
    }
}

impl From<calamine::XlsxError> for ExtractError {
    fn from(err: calamine::XlsxError) -> Self {
        ExtractError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ExtractResult<T> = Result<T, ExtractError>;
