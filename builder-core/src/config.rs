use serde::de::DeserializeOwned;
use std::{fmt, path::Path};

/// Read and parse a TOML config file into `T`, logging the path so a misconfigured deployment
/// shows up in the daemon's own logs rather than only in an operator's shell history.
pub fn from_toml_file<P: AsRef<Path> + fmt::Display, T: DeserializeOwned>(
    path: P,
) -> eyre::Result<T> {
    use eyre::WrapErr;

    tracing::info!("loading config from `{path}`...");

    let config_data = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("could not read config from `{path}`"))?;

    toml::from_str(&config_data).wrap_err("could not parse TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        value: u64,
    }

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn write_temp_file(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        path.push(format!("builder-core-config-test-{}-{}.toml", std::process::id(), id));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_from_toml_file_parses_valid_config() {
        let path = write_temp_file("name = \"builder\"\nvalue = 7\n");
        let config: Sample = from_toml_file(path.display().to_string()).unwrap();
        assert_eq!(config.name, "builder");
        assert_eq!(config.value, 7);
    }

    #[test]
    fn test_from_toml_file_rejects_malformed_toml() {
        let path = write_temp_file("not valid toml {{{");
        let result: eyre::Result<Sample> = from_toml_file(path.display().to_string());
        assert!(result.is_err());
    }
}
