use std::path::{Path, PathBuf};

pub const VISITLOG_CONNECTION_STRING_ENV: &str = "VISITLOG_CONNECTION_STRING";
pub const VISITLOG_CONFIG_ENV: &str = "VISITLOG_CONFIG";
pub const VISITLOG_SERVER_ADDR_ENV: &str = "VISITLOG_SERVER_ADDR";

pub const DEFAULT_CONFIG_FILE_NAME: &str = "appsettings.json";
pub const DEFAULT_DATABASE_FILE_NAME: &str = "visitlog.db";

pub fn default_config_path(working_dir: &Path) -> PathBuf {
    working_dir.join(DEFAULT_CONFIG_FILE_NAME)
}

pub fn default_connection_string() -> String {
    format!("Data Source={DEFAULT_DATABASE_FILE_NAME}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let base = PathBuf::from("visitlog-root");
        assert_eq!(
            default_config_path(&base),
            base.join("appsettings.json")
        );
        assert_eq!(default_connection_string(), "Data Source=visitlog.db");
        assert_eq!(VISITLOG_CONNECTION_STRING_ENV, "VISITLOG_CONNECTION_STRING");
        assert_eq!(VISITLOG_CONFIG_ENV, "VISITLOG_CONFIG");
        assert_eq!(VISITLOG_SERVER_ADDR_ENV, "VISITLOG_SERVER_ADDR");
    }
}
