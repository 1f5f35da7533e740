use crate::core::{DispatchReceipt, Record, TransformResult};
use crate::utils::error::{ErrorSeverity, MapperError};

/// Exit code per severity: Low 0, Medium 2, High 1, Critical 3.
pub fn exit_code(error: &MapperError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

pub fn render_preview(records: &[Record]) -> String {
    serde_json::to_string_pretty(records).unwrap_or_else(|e| format!("<preview unavailable: {}>", e))
}

pub fn print_transform_summary(result: &TransformResult, preview: &[Record]) {
    println!("🔄 Field Mapping:");
    if result.mapping.is_empty() {
        println!("  (no mapped columns)");
    }
    for (index, field) in &result.mapping {
        println!("  column {} → {}", index, field);
    }

    if !result.report.applied.is_empty() || !result.report.skipped.is_empty() {
        println!();
        println!("🛠️ Derived Columns:");
        println!("  applied: {}", result.report.applied.len());
        for (id, reason) in &result.report.skipped {
            println!("  skipped #{}: {}", id, reason);
        }
    }

    println!();
    println!("👀 JSON Preview (First {} Records):", preview.len());
    println!("{}", render_preview(preview));
    println!(
        "Total {} records will be sent to Backend",
        result.records.len()
    );
}

pub fn print_receipt(receipt: &DispatchReceipt) {
    println!("✅ Backend Response Successful!");
    println!(
        "Status: {} | Sent Records: {} | Time: {}",
        receipt.status,
        receipt.record_count,
        receipt.timestamp.to_rfc3339()
    );
    match serde_json::to_string_pretty(&receipt.body) {
        Ok(body) => println!("{}", body),
        Err(e) => tracing::warn!("Could not render backend response: {}", e),
    }
}

pub fn report_failure(error: &MapperError) -> i32 {
    tracing::error!(
        "❌ Process failed: {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());

    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 建議: {}", error.recovery_suggestion());

    exit_code(error)
}
