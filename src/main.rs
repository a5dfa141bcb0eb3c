// ==========================================
// 移动设备返修录入系统 - CLI 入口
// ==========================================
// 用法:
//   rma-intake ingest <文件> <公司名> <邮箱> [订单号]
//   rma-intake validate <IMEI>...
//   rma-intake failed
//
// 配置: 当前目录 rma_intake.json(缺失时用默认配置)
// ==========================================

use rma_intake::clock::SystemClock;
use rma_intake::config::AppConfig;
use rma_intake::domain::submission::{CustomerType, NewSubmission};
use rma_intake::{logging, IntakeApi};
use std::sync::Arc;

const CONFIG_PATH: &str = "rma_intake.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", rma_intake::APP_NAME);
    tracing::info!("系统版本: {}", rma_intake::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::load(CONFIG_PATH)?;
    let api = IntakeApi::new(&config, Arc::new(SystemClock))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.split_first() {
        Some((cmd, rest)) if cmd == "ingest" => cmd_ingest(&api, rest),
        Some((cmd, rest)) if cmd == "validate" => cmd_validate(&api, rest),
        Some((cmd, _)) if cmd == "failed" => cmd_failed(&api),
        _ => {
            eprintln!("用法:");
            eprintln!("  rma-intake ingest <文件> <公司名> <邮箱> [订单号]");
            eprintln!("  rma-intake validate <IMEI>...");
            eprintln!("  rma-intake failed");
            std::process::exit(2);
        }
    }
}

fn cmd_ingest(api: &IntakeApi, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let [file, company, email, rest @ ..] = args else {
        return Err("ingest 需要 <文件> <公司名> <邮箱>".into());
    };

    let new = NewSubmission {
        company_name: company.clone(),
        company_email: email.clone(),
        order_number: rest.first().cloned(),
        customer_type: CustomerType::Us,
    };

    let report = api.ingest_file(file, &new)?;
    println!("引用号: {}", report.submission.reference_number);
    println!(
        "设备 {} 台(有效 {} / 无效 {} / 重复 {}),耗时 {}ms",
        report.devices.len(),
        report.valid_count,
        report.invalid_count,
        report.duplicate_count,
        report.elapsed_ms
    );
    Ok(())
}

fn cmd_validate(api: &IntakeApi, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.is_empty() {
        return Err("validate 需要至少一个 IMEI".into());
    }

    let report = api.validate_imeis(args);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_failed(api: &IntakeApi) -> Result<(), Box<dyn std::error::Error>> {
    let entries = api.failed_sync_entries()?;
    if entries.is_empty() {
        println!("无重试耗尽条目");
        return Ok(());
    }

    for entry in entries {
        println!(
            "条目 {} 设备 {} 重试 {}/{} 最后错误: {}",
            entry.id,
            entry.device_id,
            entry.retry_count,
            entry.max_retries,
            entry.error_message.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
