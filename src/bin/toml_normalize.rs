use clap::Parser;
use nutrition_etl::core::ConfigProvider;
use nutrition_etl::utils::error::ErrorSeverity;
use nutrition_etl::utils::{logger, validation::Validate};
use nutrition_etl::{EtlEngine, LocalStorage, NormalizationPipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-normalize")]
#[command(about = "Nutrition normalization with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "normalize.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the minimum portion factor from config
    #[arg(long)]
    min_factor: Option<f64>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置 (日誌格式取決於配置，所以先載入)
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose || config.debug_logging());
    }

    tracing::info!("🚀 Starting TOML-based nutrition normalization");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(min_factor) = args.min_factor {
        config
            .normalize
            .get_or_insert(nutrition_etl::config::toml_config::NormalizeConfig { min_factor: None })
            .min_factor = Some(min_factor);
        tracing::info!("🔧 Minimum portion factor overridden to: {}", min_factor);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config).await;
        return Ok(());
    }

    let storage = LocalStorage::new(".".to_string());
    let pipeline = NormalizationPipeline::new(storage, config);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Normalization completed successfully!");
            println!("✅ Normalized {} of {} records", summary.processed, summary.extracted);
            if summary.rejected > 0 {
                println!("⚠️  {} records were rejected (see rejected.json)", summary.rejected);
            }
            println!("📁 Output saved to: {}", summary.output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Normalization failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Input: {} ({})", config.input_path(), config.record_kind());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));

    match config.min_factor() {
        Some(min) => println!("  Min Portion Factor: {}", min),
        None => println!("  Min Portion Factor: none"),
    }

    if config.monitoring_enabled() {
        println!("  Monitoring: enabled (json logs: {})", config.json_logs());
    }

    if let Some(env) = &config.environment {
        println!("  Environment: {} variables", env.len());
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    // 輸入檔分析
    println!("📥 Input Analysis:");
    match tokio::fs::read(config.input_path()).await {
        Ok(bytes) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(serde_json::Value::Array(items)) => {
                println!("  📊 {} payloads found", items.len())
            }
            Ok(serde_json::Value::Object(_)) => println!("  📊 1 payload found"),
            Ok(_) => println!("  ⚠️  Input is neither a JSON array nor an object"),
            Err(e) => println!("  ⚠️  Input is not valid JSON: {}", e),
        },
        Err(e) => println!("  ⚠️  Cannot read {}: {}", config.input_path(), e),
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    for format in config.output_formats() {
        println!("  ✅ results.{}", format);
    }
    println!("  ➕ unassessed.json / rejected.json when needed");

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
