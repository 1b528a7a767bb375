use crate::config::Config;
use clap::Args;

#[derive(Debug, Args)]
#[clap(about = "verify a config file parses and print it back out")]
pub struct Command {
    #[clap(long, env, default_value = "config.toml")]
    config_file: String,
}

impl Command {
    pub async fn execute(self) -> eyre::Result<()> {
        let config = Config::from_toml_file(&self.config_file)?;
        tracing::info!("{config:#?}");
        Ok(())
    }
}
