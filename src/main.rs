use clap::Parser;
use csv_mapper::utils::{logger, summary, validation::Validate};
use csv_mapper::{CliConfig, EtlEngine, LocalStorage, MappingPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, &config.log_format);

    tracing::info!("Starting csv-mapper CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let dry_run = config.dry_run;
    let storage = LocalStorage::current_dir();
    let pipeline = MappingPipeline::with_http(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    if dry_run {
        match engine.dry_run().await {
            Ok((result, preview)) => summary::print_transform_summary(&result, &preview),
            Err(e) => {
                let exit_code = summary::report_failure(&e);
                if exit_code > 0 {
                    std::process::exit(exit_code);
                }
            }
        }
        return Ok(());
    }

    match engine.run().await {
        Ok(receipt) => {
            tracing::info!("✅ Data sent successfully!");
            summary::print_receipt(&receipt);
        }
        Err(e) => {
            let exit_code = summary::report_failure(&e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
