use crate::env::{optional_trimmed_from_env, optional_trimmed_path_from_env};
use anyhow::{Context as _, anyhow};
use std::path::{Path, PathBuf};
use visitlog_domain::paths;

/// Parsed SQLite connection string, e.g. `Data Source=visitlog.db`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectionString {
    data_source: PathBuf,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut data_source = None;

        for part in raw.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                return Err(anyhow!("invalid connection string segment: {part}"));
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            match key.as_str() {
                "data source" | "datasource" | "filename" => data_source = Some(value),
                _ => tracing::debug!(key = %key, "ignoring connection string keyword"),
            }
        }

        let Some(data_source) = data_source else {
            return Err(anyhow!("connection string has no Data Source: {raw}"));
        };
        if data_source.is_empty() {
            return Err(anyhow!("connection string Data Source is empty"));
        }
        if data_source.eq_ignore_ascii_case(":memory:") {
            return Err(anyhow!(
                "in-memory databases are not supported; page connections must share one file"
            ));
        }

        Ok(Self {
            data_source: PathBuf::from(data_source),
        })
    }

    pub fn data_source(&self) -> &Path {
        &self.data_source
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct AppSettingsFile {
    #[serde(rename = "ConnectionStrings", default)]
    connection_strings: ConnectionStrings,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ConnectionStrings {
    #[serde(rename = "DefaultConnection")]
    default_connection: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    pub connection_string: ConnectionString,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let working_dir = std::env::current_dir().context("failed to read working directory")?;
        Self::from_env_in(&working_dir)
    }

    /// Resolves the connection string from the environment, then the settings file,
    /// then the built-in default.
    pub fn from_env_in(working_dir: &Path) -> anyhow::Result<Self> {
        if let Some(raw) = optional_trimmed_from_env(paths::VISITLOG_CONNECTION_STRING_ENV)? {
            return Self::from_raw(&raw)
                .with_context(|| format!("invalid {}", paths::VISITLOG_CONNECTION_STRING_ENV));
        }

        let (config_path, required) =
            match optional_trimmed_path_from_env(paths::VISITLOG_CONFIG_ENV)? {
                Some(path) => (path, true),
                None => (paths::default_config_path(working_dir), false),
            };

        if let Some(raw) = read_default_connection(&config_path, required)? {
            return Self::from_raw(&raw)
                .with_context(|| format!("invalid connection string in {}", config_path.display()));
        }

        Self::from_raw(&paths::default_connection_string())
    }

    fn from_raw(raw: &str) -> anyhow::Result<Self> {
        Ok(Self {
            connection_string: ConnectionString::parse(raw)?,
        })
    }
}

fn read_default_connection(path: &Path, required: bool) -> anyhow::Result<Option<String>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let parsed: AppSettingsFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    Ok(parsed
        .connection_strings
        .default_connection
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty()))
}
