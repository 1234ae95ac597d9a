//! kashi-ls specific configuration

use std::net::SocketAddr;
use std::path::PathBuf;

/// Lyrics service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub settings_path: PathBuf,
}

impl Config {
    /// Derive file locations from the resolved data directory
    pub fn new(bind_addr: SocketAddr, data_dir: PathBuf) -> Self {
        let db_path = data_dir.join("kashi.db");
        let settings_path = data_dir.join("settings.toml");
        Self {
            bind_addr,
            data_dir,
            db_path,
            settings_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_data_dir() {
        let config = Config::new(
            "127.0.0.1:5730".parse().expect("addr"),
            PathBuf::from("/tmp/kashi"),
        );
        assert_eq!(config.db_path, PathBuf::from("/tmp/kashi/kashi.db"));
        assert_eq!(
            config.settings_path,
            PathBuf::from("/tmp/kashi/settings.toml")
        );
    }
}
