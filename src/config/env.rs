use std::time::Duration;

use super::SettingsError;

/// Reads one variable through `lookup`, treating blank values as unset.
pub(crate) fn read_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn process_env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub(crate) fn parse_timeout_seconds(name: &str, value: &str) -> Result<Duration, SettingsError> {
    let parsed = value
        .trim()
        .parse::<u64>()
        .map_err(|_| SettingsError::invalid(name, "must be a positive integer in seconds"))?;
    if parsed == 0 {
        return Err(SettingsError::invalid(
            name,
            "must be greater than 0 seconds",
        ));
    }
    Ok(Duration::from_secs(parsed))
}

pub(crate) fn read_timeout<F>(lookup: &F, name: &str) -> Result<Option<Duration>, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = read_var(lookup, name) else {
        return Ok(None);
    };
    Ok(Some(parse_timeout_seconds(name, &value)?))
}

pub(crate) fn resolve_timeout_with_global_fallback<F>(
    provider_timeout: Option<Duration>,
    read_global_timeout: F,
    default_timeout: Duration,
) -> Result<Duration, SettingsError>
where
    F: FnOnce() -> Result<Option<Duration>, SettingsError>,
{
    if let Some(timeout) = provider_timeout {
        return Ok(timeout);
    }

    Ok(read_global_timeout()?.unwrap_or(default_timeout))
}

pub(crate) fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::{parse_timeout_seconds, read_var, resolve_timeout_with_global_fallback, split_csv};
    use crate::config::SettingsError;

    #[test]
    fn parse_timeout_seconds_accepts_positive_integer_values() {
        let timeout = parse_timeout_seconds("TEST_TIMEOUT", " 8 ")
            .expect("positive integer timeout should parse");
        assert_eq!(timeout, Duration::from_secs(8));
    }

    #[test]
    fn parse_timeout_seconds_rejects_invalid_values() {
        let zero = parse_timeout_seconds("TEST_TIMEOUT", "0")
            .expect_err("zero timeout should fail validation");
        assert_eq!(
            zero.to_string(),
            "TEST_TIMEOUT must be greater than 0 seconds"
        );

        let invalid = parse_timeout_seconds("TEST_TIMEOUT", "abc")
            .expect_err("non-integer timeout should fail validation");
        assert!(matches!(
            invalid,
            SettingsError::Invalid { name, reason }
            if name == "TEST_TIMEOUT" && reason == "must be a positive integer in seconds"
        ));
    }

    #[test]
    fn resolve_timeout_with_global_fallback_is_lazy_for_provider_timeout() {
        let global_called = Cell::new(false);

        let timeout = resolve_timeout_with_global_fallback(
            Some(Duration::from_secs(3)),
            || {
                global_called.set(true);
                Err(SettingsError::invalid("LLM_TIMEOUT_SECS", "should not be parsed"))
            },
            Duration::from_secs(60),
        )
        .expect("provider-specific timeout should short-circuit global fallback");

        assert_eq!(timeout, Duration::from_secs(3));
        assert!(!global_called.get());
    }

    #[test]
    fn resolve_timeout_with_global_fallback_uses_global_then_default() {
        let global = resolve_timeout_with_global_fallback(
            None,
            || Ok(Some(Duration::from_secs(9))),
            Duration::from_secs(60),
        )
        .expect("global timeout should be used when provider timeout is absent");
        let default =
            resolve_timeout_with_global_fallback(None, || Ok(None), Duration::from_secs(60))
                .expect("default timeout should be used when both values are missing");

        assert_eq!(global, Duration::from_secs(9));
        assert_eq!(default, Duration::from_secs(60));
    }

    #[test]
    fn read_var_treats_blank_values_as_unset() {
        let lookup = |name: &str| match name {
            "BLANK" => Some("   ".to_string()),
            "SET" => Some(" value ".to_string()),
            _ => None,
        };

        assert_eq!(read_var(&lookup, "BLANK"), None);
        assert_eq!(read_var(&lookup, "MISSING"), None);
        assert_eq!(read_var(&lookup, "SET"), Some("value".to_string()));
    }

    #[test]
    fn split_csv_drops_blank_items() {
        assert_eq!(
            split_csv(" a, ,b ,,c"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
