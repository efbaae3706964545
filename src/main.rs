use clap::{Parser, Subcommand};
use nestegg::api::{ProjectArgs, SolveArgs, run_http_server, run_project_command, run_solve_command};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    version,
    about = "Monte Carlo retirement projection: time to target and nest egg survival"
)]
struct Cli {
    /// Fallback log filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one projection and print the report as JSON.
    Project(ProjectArgs),
    /// Search for the investment or spending that meets a success rate.
    Solve(SolveArgs),
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn blocking(job: impl FnOnce() -> Result<String, String> + Send + 'static) -> Result<(), String> {
    let json = tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| format!("Simulation task failed: {e}"))??;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let outcome = match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Project(args) => blocking(move || run_project_command(args)).await,
        Command::Solve(args) => blocking(move || run_solve_command(args)).await,
    };

    if let Err(msg) = outcome {
        eprintln!("{msg}");
        std::process::exit(1);
    }
}
