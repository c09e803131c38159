//! Load configuration from files.
use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;

use crate::Conf;

/// Errors loading the gateway process configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unable to decode configuration from file at the given path.
    #[error("unable to decode configuration from file at '{0}'")]
    Decode(String),

    /// Unable to read configuration file at the given path.
    #[error("unable to read configuration file at '{0}'")]
    Open(String),

    /// Configuration file not found at the given path.
    #[error("configuration file not found at '{0}'")]
    PathNotFound(String),
}

/// Load process configuration from the specified path.
pub fn load(path: &str) -> Result<Conf> {
    if !PathBuf::from(path).exists() {
        let error = Error::PathNotFound(path.to_string());
        return Err(anyhow::anyhow!(error));
    }

    let file = File::open(path).with_context(|| Error::Open(path.into()))?;
    let conf = serde_yaml::from_reader(file).with_context(|| Error::Decode(path.into()))?;
    Ok(conf)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    #[test]
    fn missing_file_is_reported() {
        let result = super::load("/does/not/exist.yaml");
        assert!(result.is_err());
    }

    #[test]
    fn loads_service_defaults_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "services:\n  rethink-persist:\n    rethink-db: persist\n    reset: true\n"
        )
        .unwrap();
        let conf = super::load(file.path().to_str().unwrap()).unwrap();
        let service = conf.service("rethink-persist").unwrap();
        assert_eq!(service.rethink_host, "localhost:28015");
        assert_eq!(service.rethink_db, "persist");
        assert!(service.reset);
    }
}
