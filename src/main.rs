use color_eyre::eyre::{
    Result,
    eyre,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn init_tracing() {
    // The TUI owns stdout, so logs go to a rolling file next to the binary.
    let file = rolling::daily(".", "gridstake.log");
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = LOG_GUARD.set(guard);
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: gridstake [--actor alice|bob] [--tick-ms <n>]\n\
         \n\
         Flags:\n\
           --actor <name>   Identity to start as (default alice)\n\
           --tick-ms <n>    Refresh interval in milliseconds (default 1000)"
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut config = client::AppConfig::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--actor" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--actor requires a name argument"))?;
                config.starting_actor = match name.as_str() {
                    "alice" => client::ActorKind::Alice,
                    "bob" => client::ActorKind::Bob,
                    other => return Err(eyre!("Unknown actor: {other}")),
                };
            }
            "--tick-ms" => {
                let ms = args
                    .next()
                    .ok_or_else(|| eyre!("--tick-ms requires a number argument"))?;
                let ms: u64 = ms
                    .parse()
                    .map_err(|_| eyre!("--tick-ms argument must be a number"))?;
                config.tick = Duration::from_millis(ms);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();
    let config = parse_cli_args()?;
    client::run_app(config).await
}
