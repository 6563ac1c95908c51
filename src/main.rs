use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rmgen::cli;

fn main() {
    let command_line_interface = cli::CommandLineInterface::load();

    let default_filter = if command_line_interface.verbose() { "rmgen=debug" } else { "rmgen=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    if let Err(error) = command_line_interface.run() {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}
