use crate::config::toml_config::{AppConfig, DEFAULT_CONFIG_PATH};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "geojobs-etl")]
#[command(about = "Reverse-geocode firm locations and scrape job listings into tables")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override load.output_path
    #[arg(long)]
    pub output_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Reverse-geocode every firm in the input CSV and count nearby banks
    Geocode {
        /// Override geocode.input_path
        #[arg(long)]
        input: Option<String>,
    },
    /// Search the job site and scrape every result's detail page
    Jobs {
        /// Override jobs.keyword
        #[arg(long)]
        keyword: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },
    /// Load and validate the configuration, then exit
    CheckConfig,
}

impl Cli {
    /// 將命令列覆蓋套用到設定
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(output_path) = &self.output_path {
            config.load.output_path = output_path.clone();
            tracing::info!("🔧 Output path overridden to: {}", output_path);
        }

        match &self.command {
            Command::Geocode { input: Some(input) } => {
                config.geocode.input_path = input.clone();
                tracing::info!("🔧 Input path overridden to: {}", input);
            }
            Command::Jobs { keyword, headed } => {
                if let Some(keyword) = keyword {
                    config.jobs.keyword = keyword.clone();
                    tracing::info!("🔧 Keyword overridden to: {}", keyword);
                }
                if *headed {
                    config.jobs.headless = false;
                }
            }
            _ => {}
        }
    }
}
