//! Rally detector binary.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use condenser_cli::{run, Args};

fn init_tracing(debug: bool, quiet: bool) -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let level = if quiet {
        "condenser=error"
    } else if debug {
        "condenser=debug"
    } else {
        "condenser=info"
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    if let Err(e) = init_tracing(args.debug, args.quiet) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(inputs = args.inputs.len(), zones = %args.zones.display(), "Starting condenser");

    match run(&args).await {
        Ok(reports) => {
            let clips: usize = reports.iter().map(|(_, r)| r.clips.len()).sum();
            info!(reports = reports.len(), clips, "Done");
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
