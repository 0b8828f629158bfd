// Contract Risk CLI
//
// Command-line interface for analyzing deployed contracts and raw bytecode.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contract_risk::api::{ConfigManager, EngineConfig, ReportFormat, ReportFormatter, RiskEngine};
use contract_risk::bytecode::BytecodeAnalyzer;
use contract_risk::ethereum::chain::ChainRegistry;
use contract_risk::ProgressEvent;
use dotenv::dotenv;
use log::warn;
use std::fs;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Contract Risk - smart contract risk analyzer
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a deployed contract
    Analyze {
        /// Contract address
        #[clap(short, long)]
        address: String,

        /// Chain ID
        #[clap(long, default_value = "1")]
        chain_id: u64,

        /// Output format (json, text)
        #[clap(short, long, default_value = "text")]
        format: String,

        /// Output file path
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Path to configuration file
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Print milestone progress to stderr
        #[clap(long)]
        progress: bool,
    },

    /// Run the bytecode heuristics on a hex string or file
    Bytecode {
        /// Path to the bytecode file or hex string
        #[clap(short, long)]
        input: String,
    },

    /// Generate a default configuration file
    Config {
        /// Output file path
        #[clap(short, long)]
        output: PathBuf,
    },

    /// List supported chains
    ListChains,
}

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            address,
            chain_id,
            format,
            output,
            config,
            progress,
        } => {
            let config = ConfigManager::load(config.as_ref()).context("Failed to load configuration")?;
            let report_format: ReportFormat = format.parse()?;

            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(async {
                let engine = RiskEngine::from_config(config)?;
                if !progress {
                    return engine.run_analysis(&address, chain_id).await;
                }

                let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
                let printer = tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        if let Some(current) = event.current {
                            eprintln!("[{:>3}%] {} {}", event.overall, current.id, current.message);
                        }
                    }
                });
                let report = engine.run_analysis_with_progress(&address, chain_id, tx).await;
                if let Err(e) = printer.await {
                    warn!("Progress printer stopped: {}", e);
                }
                report
            })?;

            if let Some(output_path) = output {
                ReportFormatter::save_to_file(&report, &output_path, report_format)
                    .context("Failed to save report")?;
                println!("Report saved to {:?}", output_path);
            } else {
                let report_str = match report_format {
                    ReportFormat::Json => ReportFormatter::to_json(&report)?,
                    ReportFormat::Text => ReportFormatter::to_text(&report),
                };
                println!("{}", report_str);
            }

            Ok(())
        }
        Commands::Bytecode { input } => {
            let bytecode = if input.starts_with("0x") || input.chars().all(|c| c.is_ascii_hexdigit()) {
                input
            } else {
                fs::read_to_string(&input)
                    .context("Failed to read bytecode file")?
                    .trim()
                    .to_string()
            };

            let analysis = BytecodeAnalyzer::new().analyze("", &bytecode);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }
        Commands::Config { output } => {
            let config = EngineConfig::default();
            ConfigManager::save_to_file(&config, &output).context("Failed to save configuration")?;
            println!("Default configuration saved to {:?}", output);
            Ok(())
        }
        Commands::ListChains => {
            for chain in ChainRegistry::new().chains() {
                println!("{:>10}  {:<20} {}", chain.chain_id, chain.name, chain.rpc_url);
            }
            Ok(())
        }
    }
}
