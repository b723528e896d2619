use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(err: &anyhow::Error) -> std::process::ExitCode {
    if let Some(rx_err) = err.downcast_ref::<rxlabel_cli::error::RxLabelError>() {
        eprintln!("Error: {rx_err}");
    } else {
        eprintln!("Error: {err}");
    }
    std::process::ExitCode::from(1)
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let cli = rxlabel_cli::cli::Cli::parse();
    match cli.command {
        rxlabel_cli::cli::Commands::Shell { ref args } => {
            match rxlabel_cli::cli::run_shell(args, cli.catalog.as_deref(), cli.json).await {
                Ok(()) => std::process::ExitCode::SUCCESS,
                Err(err) => report(&err),
            }
        }
        rxlabel_cli::cli::Commands::Health => {
            match rxlabel_cli::cli::run_health(cli.catalog.as_deref(), cli.json).await {
                Ok((output, healthy)) => {
                    println!("{output}");
                    if healthy {
                        std::process::ExitCode::SUCCESS
                    } else {
                        std::process::ExitCode::from(1)
                    }
                }
                Err(err) => report(&err),
            }
        }
        _ => match rxlabel_cli::cli::run(cli).await {
            Ok(output) => {
                println!("{output}");
                std::process::ExitCode::SUCCESS
            }
            Err(err) => report(&err),
        },
    }
}
