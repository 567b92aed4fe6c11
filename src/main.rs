use anyhow::Result;
use clap::Parser;
use outreach::app::{self, AppContext};
use outreach::cli::RootArgs;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "OUTREACH_LOG";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    app::run(args, &AppContext::from_env())
}
