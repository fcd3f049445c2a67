/// Startup configuration read from the environment
use crate::error::ConfigError;
use crate::view::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8050;
pub const DEFAULT_GROUP_BY: &str = "continent";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Debug logging, detailed client errors and permissive CORS
    pub debug: bool,
    /// CSV or JSON file to serve instead of the bundled dataset
    pub data_path: Option<PathBuf>,
    /// Column the chart groups rows by
    pub group_by: String,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: false,
            data_path: None,
            group_by: DEFAULT_GROUP_BY.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Read `HOST`, `PORT`, `DEBUG`, `DATA_PATH`, `GROUP_BY` and `PAGE_SIZE`
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Unset variables take their
    /// defaults; set but unusable ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("HOST") {
            config.host = non_blank("HOST", host)?;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse_number("PORT", &port)?;
        }
        if let Some(debug) = lookup("DEBUG") {
            config.debug = is_truthy(&debug);
        }
        if let Some(path) = lookup("DATA_PATH") {
            config.data_path = Some(PathBuf::from(non_blank("DATA_PATH", path)?));
        }
        if let Some(group_by) = lookup("GROUP_BY") {
            config.group_by = non_blank("GROUP_BY", group_by)?;
        }
        if let Some(page_size) = lookup("PAGE_SIZE") {
            config.page_size = parse_number("PAGE_SIZE", &page_size)?;
            if config.page_size == 0 {
                return Err(ConfigError::Zero { name: "PAGE_SIZE" });
            }
        }

        Ok(config)
    }

    /// Default log filter for the binary
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_blank(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Blank { name });
    }
    Ok(trimmed.to_string())
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::NotANumber {
        name,
        value: value.to_string(),
    })
}
