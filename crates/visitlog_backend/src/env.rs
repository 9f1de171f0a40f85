use anyhow::anyhow;
use std::path::PathBuf;

pub(crate) fn optional_trimmed_from_env(name: &str) -> anyhow::Result<Option<String>> {
    let value = match std::env::var_os(name) {
        Some(value) => value,
        None => return Ok(None),
    };

    let value = value.to_string_lossy();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{name} is set but empty"));
    }

    Ok(Some(trimmed.to_owned()))
}

pub(crate) fn optional_trimmed_path_from_env(name: &str) -> anyhow::Result<Option<PathBuf>> {
    Ok(optional_trimmed_from_env(name)?.map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::{optional_trimmed_from_env, optional_trimmed_path_from_env};
    use crate::test_support::EnvScope;
    use std::path::PathBuf;

    #[test]
    fn optional_trimmed_from_env_returns_none_when_unset() {
        let mut env = EnvScope::new();
        env.unset("VISITLOG_TEST_TRIMMED_ENV");

        let loaded = optional_trimmed_from_env("VISITLOG_TEST_TRIMMED_ENV")
            .expect("unset env should not error");
        assert!(loaded.is_none());
    }

    #[test]
    fn optional_trimmed_from_env_errors_on_empty() {
        let mut env = EnvScope::new();
        env.set("VISITLOG_TEST_TRIMMED_ENV", "   ");

        let err = optional_trimmed_from_env("VISITLOG_TEST_TRIMMED_ENV")
            .expect_err("empty env should error");
        assert!(
            err.to_string()
                .contains("VISITLOG_TEST_TRIMMED_ENV is set but empty"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn optional_trimmed_path_from_env_trims_value() {
        let mut env = EnvScope::new();
        env.set("VISITLOG_TEST_TRIMMED_ENV", " visitlog-test ");

        let loaded = optional_trimmed_path_from_env("VISITLOG_TEST_TRIMMED_ENV")
            .expect("non-empty env should succeed");
        assert_eq!(loaded, Some(PathBuf::from("visitlog-test")));
    }
}
