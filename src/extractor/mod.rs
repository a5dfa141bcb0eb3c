// ==========================================
// 移动设备返修录入系统 - 提取层
// ==========================================
// 职责: 外部表格文件 → 表头定位 → 候选设备记录 + IMEI 校验
// 支持: Excel, CSV, 内存网格
// ==========================================

// 模块声明
pub mod cell;
pub mod device_extractor;
pub mod error;
pub mod header_mapper;
pub mod imei;
pub mod row_extractor;
pub mod validator;

// 重导出核心类型
pub use cell::RawCell;
pub use device_extractor::{DeviceExtractor, ExtractionReport};
pub use error::{ExtractError, ExtractResult};
pub use header_mapper::{find_header_row, ColumnMap, HeaderInfo, HEADER_SCAN_ROWS};
pub use imei::{clean_imei, extract_imei, looks_like_imei, IMEI_LEN, IMEI_PREFIX};
pub use validator::ImeiValidator;
