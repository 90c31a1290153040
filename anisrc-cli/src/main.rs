mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::{CommandExecutor, Overrides},
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::process;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    // errors are reported in JSON only when asked for on the command line
    let json_errors = args.output.is_some_and(|format| format.is_json());

    if let Err(e) = run(args).await {
        if json_errors {
            let error_json = serde_json::json!({
                "status": "error",
                "message": e.to_string(),
            });
            println!("{error_json}");
        } else {
            error!("Application error: {}", e);
            #[cfg(feature = "colored-output")]
            {
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
            #[cfg(not(feature = "colored-output"))]
            {
                eprintln!("Error: {}", e);
            }
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet)?;

    let config = AppConfig::load(args.config.as_deref())?;
    debug!("Loaded configuration: {:?}", config);

    let overrides = Overrides {
        timeout: args.timeout,
        quality: args.quality,
        server: args.server,
        base_url: args.base_url,
        output: args.output,
    };

    match args.command {
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            return Ok(());
        }

        Commands::Config { show, reset } => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
            return Ok(());
        }

        _ => {}
    }

    let executor = CommandExecutor::new(config, overrides)?;

    match args.command {
        Commands::Sources => executor.list_sources()?,
        Commands::Hosts => executor.list_hosts()?,
        Commands::Popular { source, page } => executor.popular(&source, page).await?,
        Commands::Latest { source, page } => executor.latest(&source, page).await?,
        Commands::Search {
            source,
            query,
            page,
            filters,
        } => executor.search(&source, &query, page, &filters).await?,
        Commands::Catalog { source, max_pages } => executor.catalog(&source, max_pages).await?,
        Commands::Details { source, url } => executor.details(&source, &url).await?,
        Commands::Episodes { source, url } => executor.episodes(&source, &url).await?,
        Commands::Videos {
            source,
            episode_url,
        } => executor.videos(&source, &episode_url).await?,
        Commands::Resolve { url, prefix } => executor.resolve(&url, &prefix).await?,
        Commands::Config { .. } | Commands::Completions { .. } => {}
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    // logs go to stderr so that stdout stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .init();
    Ok(())
}
