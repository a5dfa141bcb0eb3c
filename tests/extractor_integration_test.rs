// ==========================================
// 提取层集成测试
// ==========================================
// 测试目标: 验证完整的 文件 → 表头定位 → 行提取 → 校验 流程
// ==========================================

mod test_helpers;

use rma_intake::domain::device::ImeiWarning;
use rma_intake::extractor::{DeviceExtractor, ExtractError, RawCell};
use rma_intake::logging;
use test_helpers::write_csv;

#[test]
fn test_csv_full_pipeline_with_messy_layout() {
    logging::init_test();

    // 真实客户文件形态: 品牌抬头 + 空行 + 表头 + 混杂数据
    let f = write_csv(&[
        "ACME Recycling - Device Returns,,,",
        ",,,",
        "Export date: 2025-10-30,,,",
        "IMEI Number,Device Model,Storage,Unit Price",
        "351454482579210,iPhone 12,128GB,$250.00",
        "35-1454-482579-211,iPhone 13,256GB,\"$1,100.00\"",
        "Subtotal,,,$1350.00",
        "357068940352541,Pixel 8,128GB,$199.00",
    ]);

    let report = DeviceExtractor::default()
        .extract_from_file(f.path())
        .unwrap();

    assert_eq!(report.header.row_index, 3);
    assert_eq!(report.total_rows, 8);
    // 小计行无 IMEI 形值,静默跳过
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.valid_count(), 3);

    // 带分隔符的 IMEI 被清洗; 纯分隔符去除不计清洗警告
    assert_eq!(report.records[1].imei, "351454482579211");
    assert!(report.records[1].validation.warnings.is_empty());

    // 千分位价格解析
    assert_eq!(report.records[1].unit_price, Some(1100.0));
    assert_eq!(report.records[2].model.as_deref(), Some("Pixel 8"));
}

#[test]
fn test_csv_scientific_notation_survives_as_text() {
    logging::init_test();

    let f = write_csv(&[
        "IMEI,Model",
        "3.51454E+14,Galaxy S22",
        "3.5706894035254e14,Pixel 8",
    ]);

    let report = DeviceExtractor::default()
        .extract_from_file(f.path())
        .unwrap();
    assert_eq!(report.records.len(), 2);

    // 截断尾数只能恢复出补零形式
    assert_eq!(report.records[0].imei, "351454000000000");
    assert!(report.records[0]
        .validation
        .warnings
        .contains(&ImeiWarning::ScientificNotation));

    // 全尾数文本可精确重建
    assert_eq!(report.records[1].imei, "357068940352540");
}

#[test]
fn test_header_outside_scan_window_rejects_file() {
    logging::init_test();

    let mut lines: Vec<String> = (0..20).map(|i| format!("note {},", i)).collect();
    lines.push("IMEI,Model".to_string());
    lines.push("351454482579210,iPhone".to_string());
    let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let f = write_csv(&refs);

    let err = DeviceExtractor::default()
        .extract_from_file(f.path())
        .unwrap_err();
    assert!(matches!(err, ExtractError::NoHeaderFound { scanned: 20 }));
}

#[test]
fn test_in_memory_grid_matches_file_semantics() {
    logging::init_test();

    // 表单粘贴路径: 数值单元格带科学计数法显示文本,底层全精度可恢复
    let grid = vec![
        vec![RawCell::text("imei"), RawCell::text("grade")],
        vec![
            RawCell::number_with_display(351454482579210.0, "3.51454E+14"),
            RawCell::text("A"),
        ],
    ];

    let report = DeviceExtractor::default().extract_from_grid(&grid).unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].imei, "351454482579210");
    assert!(report.records[0].validation.is_valid);
    assert_eq!(
        report.records[0].validation.warnings,
        vec![ImeiWarning::ScientificNotation]
    );
    assert_eq!(report.records[0].condition.as_deref(), Some("A"));
}
