use clap::Parser;
use csv_mapper::core::ConfigProvider;
use csv_mapper::utils::{logger, summary, validation::Validate};
use csv_mapper::{EtlEngine, LocalStorage, MappingPipeline, TomlConfig};
use std::path::Path;

#[derive(Parser)]
#[command(name = "toml-mapper")]
#[command(about = "CSV field mapper driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "mapper-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the endpoint from config
    #[arg(long)]
    endpoint: Option<String>,

    /// Dry run - show the mapping and a preview without sending
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置（日誌格式由配置決定，因此先載入）
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    logger::init_logger(args.verbose, config.log_format().unwrap_or("compact"));
    tracing::info!("🚀 Starting TOML-based CSV mapper");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(endpoint) = args.endpoint {
        tracing::info!("🔧 Endpoint overridden to: {}", endpoint);
        config.target.endpoint = endpoint;
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, args.dry_run);

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    let preview = config.preview_enabled();

    // 檔案路徑相對於配置檔所在目錄
    let base_dir = Path::new(&args.config)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let storage = LocalStorage::new(base_dir);
    let pipeline = MappingPipeline::with_http(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    let outcome = if args.dry_run || preview {
        let result = match engine.dry_run().await {
            Ok((result, records)) => {
                summary::print_transform_summary(&result, &records);
                result
            }
            Err(e) => std::process::exit(summary::report_failure(&e).max(1)),
        };
        if args.dry_run {
            return Ok(());
        }
        println!();
        engine.dispatch(result).await
    } else {
        engine.run().await
    };

    match outcome {
        Ok(receipt) => summary::print_receipt(&receipt),
        Err(e) => {
            let exit_code = summary::report_failure(&e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, dry_run: bool) {
    println!("📋 Configuration Summary:");
    println!("  Session: {}", config.session.name);
    if let Some(description) = &config.session.description {
        println!("  Description: {}", description);
    }
    println!("  Primary: {}", config.primary_file());
    println!("  Reference: {}", config.reference_file());
    println!("  Endpoint: {}", config.api_endpoint());
    println!(
        "  Auto-mapping: {} | Apply mapping: {}",
        config.auto_map(),
        config.apply_mapping()
    );
    println!("  Mapping overrides: {}", config.mapping.overrides.len());
    println!("  Derived columns: {}", config.derive.len());

    if let Some(output) = config.output_path() {
        println!("  Output: {}", output);
    }

    if let Some(timeout) = config.timeout_seconds() {
        println!("  Timeout: {}s", timeout);
    }

    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
