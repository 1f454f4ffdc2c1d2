// src/main.rs

use data_manager::config::load_and_validate;
use data_manager::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("data-manager error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let cfg = load_and_validate(&args.config)?;
    logging::init_logging(args.log_level, cfg.paths.log_file.as_deref())?;
    run(args, cfg).await
}
