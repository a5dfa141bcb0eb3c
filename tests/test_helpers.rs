// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、固定时钟、样例数据
// ==========================================

use chrono::{DateTime, TimeZone, Utc};
use rma_intake::clock::{FixedClock, SharedClock};
use rma_intake::db::configure_sqlite_connection;
use rma_intake::domain::submission::{CustomerType, NewSubmission};
use rma_intake::repository::init_schema;
use rusqlite::Connection;
use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
#[allow(dead_code)]
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建共享的内存测试库(已建表)
#[allow(dead_code)]
pub fn create_shared_connection() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().expect("打开内存库失败");
    configure_sqlite_connection(&conn).expect("PRAGMA 配置失败");
    init_schema(&conn).expect("建表失败");
    Arc::new(Mutex::new(conn))
}

/// 固定时钟: 2025-11-01 12:00:00 UTC
#[allow(dead_code)]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 1, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn fixed_clock(at: DateTime<Utc>) -> SharedClock {
    Arc::new(FixedClock::new(at))
}

/// 样例提交批次输入
#[allow(dead_code)]
pub fn sample_submission() -> NewSubmission {
    NewSubmission {
        company_name: "ACME Recycling".to_string(),
        company_email: "returns@acme.test".to_string(),
        order_number: Some("PO-1001".to_string()),
        customer_type: CustomerType::Us,
    }
}

/// 写出临时 CSV 文件
#[allow(dead_code)]
pub fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("创建临时文件失败");
    for line in lines {
        writeln!(f, "{}", line).expect("写入失败");
    }
    f.flush().expect("flush 失败");
    f
}
