use clap::Parser;
use geojobs_etl::utils::error::{ErrorSeverity, EtlError};
use geojobs_etl::utils::{logger, validation::Validate};
use geojobs_etl::{AmapClient, AppConfig, Cli, Command, EtlEngine, GeocodePipeline, LocalStorage, RunOutcome};

fn exit_code(e: &EtlError) -> i32 {
    // 根據錯誤嚴重程度決定退出碼
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(stage: &str, e: &EtlError) -> i32 {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    exit_code(e)
}

fn validate_for(command: &Command, config: &AppConfig) -> geojobs_etl::Result<()> {
    match command {
        Command::Geocode { .. } => {
            config.validate_geocode()?;
            config.validate_load()
        }
        Command::Jobs { .. } => {
            config.validate_jobs()?;
            config.validate_load()
        }
        Command::CheckConfig => config.validate(),
    }
}

async fn run_geocode(config: AppConfig) -> geojobs_etl::Result<RunOutcome> {
    let storage = LocalStorage::new(config.load.output_path.clone());
    let client = AmapClient::new(&config.geocode)?;
    let pipeline = GeocodePipeline::new(storage, client, config);
    EtlEngine::new(pipeline).run().await
}

#[cfg(feature = "browser")]
async fn run_jobs(config: AppConfig) -> geojobs_etl::Result<RunOutcome> {
    let storage = LocalStorage::new(config.load.output_path.clone());
    let driver = geojobs_etl::ChromeDriver::launch(&config.jobs)?;
    let pipeline = geojobs_etl::JobsPipeline::new(storage, driver, config)?;
    EtlEngine::new(pipeline).run().await
}

#[cfg(not(feature = "browser"))]
async fn run_jobs(_config: AppConfig) -> geojobs_etl::Result<RunOutcome> {
    Err(EtlError::MissingConfigError {
        field: "feature \"browser\" (rebuild with --features browser)".to_string(),
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting geojobs-etl");
    tracing::debug!("CLI arguments: {:?}", cli);

    let mut config = match AppConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => std::process::exit(report_failure("Loading configuration", &e)),
    };
    cli.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = validate_for(&cli.command, &config) {
        std::process::exit(report_failure("Configuration validation", &e));
    }

    let result = match &cli.command {
        Command::CheckConfig => {
            println!("✅ Configuration '{}' is valid", cli.config);
            return;
        }
        Command::Geocode { .. } => run_geocode(config).await,
        Command::Jobs { .. } => run_jobs(config).await,
    };

    match result {
        Ok(outcome) => {
            let report = &outcome.report;
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", outcome.output_path);
            println!(
                "📊 {} of {} records saved, {} skipped ({} fetch errors, {} parse errors), {} timeouts",
                report.succeeded,
                report.attempted,
                report.skipped(),
                report.fetch_failures,
                report.parse_failures,
                report.timeouts
            );
        }
        Err(e) => {
            let code = report_failure("ETL process", &e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }
}
