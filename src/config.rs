use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use core::str;
use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::param::DEFAULT_PORT;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    site_root: String,
    port: u16,
    worker_threads: usize,
    local: bool,
    #[serde(default = "default_accept_pause_ms")]
    accept_pause_ms: u64,
}

fn default_accept_pause_ms() -> u64 {
    1000 // 每次 accept 之后的固定接纳间隔，粗糙的准入节流，不是真正的背压
}

impl Config {
    pub fn new() -> Self {
        Self {
            site_root: "Site".to_string(),
            port: DEFAULT_PORT,
            worker_threads: 0,
            local: true,
            accept_pause_ms: default_accept_pause_ms(),
        }
    }

    pub fn from_toml(filename: &str) -> Self {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => panic!("no such file {} exception:{}", filename, e),
        };
        let mut str_val = String::new();
        match file.read_to_string(&mut str_val) {
            Ok(s) => s,
            Err(e) => panic!("Error Reading file: {}", e),
        };

        let mut raw_config: Config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(_) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置");
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.site_root.is_empty() {
            warn!("site_root为空，将使用默认站点目录Site。");
            raw_config.site_root = "Site".to_string();
        }
        raw_config
    }
}

impl Config {
    pub fn site_root(&self) -> &str {
        &self.site_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn accept_pause_ms(&self) -> u64 {
        self.accept_pause_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.site_root(), "Site");
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.accept_pause_ms(), 1000);
        assert!(config.local());
    }

    #[test]
    fn test_accept_pause_defaults_when_absent() {
        let config: Config = toml::from_str(
            r#"
            site_root = "Site"
            port = 1550
            worker_threads = 4
            local = true
            "#,
        )
        .unwrap();
        assert_eq!(config.accept_pause_ms(), 1000);
        assert_eq!(config.worker_threads(), 4);
    }
}
