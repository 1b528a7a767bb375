use crate::{config::Config, daemon::Daemon};
use clap::Args;

#[derive(Debug, Args)]
#[clap(about = "run the builder agent")]
pub struct Command {
    #[clap(long, env, default_value = "config.toml")]
    config_file: String,
}

impl Command {
    pub async fn execute(self) -> eyre::Result<()> {
        let config = Config::from_toml_file(&self.config_file)?;
        Daemon::new(config).run().await
    }
}
