use {
    anyhow::Result,
    clap::Parser,
    sealstream::{
        cli::{Cli, Command, default_config_path},
        config::Config,
        print_keys, run, setup_logger,
    },
    tracing::error,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.command == Command::GenerateKeys {
        return print_keys();
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)?;
    setup_logger(config.log_file.as_deref(), &config.log_filter)?;

    run(cli, config)
        .await
        .inspect_err(|err| error!("{err:?}"))
}
