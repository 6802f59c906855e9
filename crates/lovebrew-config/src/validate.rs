//! Parsing helpers for individual configuration values.

#![allow(clippy::redundant_pub_crate)]

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

pub(crate) fn parse_port(field: &'static str, raw: &str) -> ConfigResult<u16> {
    let port = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::invalid(field, raw, "must be an integer"))?;
    if !(1..=65_535).contains(&port) {
        return Err(ConfigError::invalid(
            field,
            raw,
            "must be between 1 and 65535",
        ));
    }
    u16::try_from(port).map_err(|_| ConfigError::invalid(field, raw, "must be between 1 and 65535"))
}

pub(crate) fn parse_ip(field: &'static str, raw: &str) -> ConfigResult<IpAddr> {
    IpAddr::from_str(raw.trim())
        .map_err(|_| ConfigError::invalid(field, raw, "must be an IP address"))
}

pub(crate) fn parse_positive_usize(field: &'static str, raw: &str) -> ConfigResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::invalid(field, raw, "must be greater than zero")),
        Ok(value) => Ok(value),
        Err(_) => Err(ConfigError::invalid(field, raw, "must be an integer")),
    }
}

pub(crate) fn parse_timeout_secs(field: &'static str, raw: &str) -> ConfigResult<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(field, raw, "must be greater than zero")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(ConfigError::invalid(field, raw, "must be a whole number of seconds")),
    }
}

pub(crate) fn parse_path(field: &'static str, raw: &str) -> ConfigResult<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(field, raw, "must not be empty"));
    }
    Ok(PathBuf::from(trimmed))
}

pub(crate) fn parse_non_empty(field: &'static str, raw: &str) -> ConfigResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(field, raw, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_port_rejects_out_of_range_values() {
        assert_eq!(parse_port("PORT", "5001"), Ok(5001));
        let err = parse_port("PORT", "0").unwrap_err();
        assert_eq!(err.reason(), "must be between 1 and 65535");
        assert!(parse_port("PORT", "70000").is_err());
        assert_eq!(
            parse_port("PORT", "http").unwrap_err().reason(),
            "must be an integer"
        );
    }

    #[test]
    fn parse_positive_usize_rejects_zero() {
        assert_eq!(parse_positive_usize("MAX", "1024"), Ok(1024));
        assert!(parse_positive_usize("MAX", "0").is_err());
        assert!(parse_positive_usize("MAX", "-1").is_err());
    }

    #[test]
    fn parse_timeout_and_paths() {
        assert_eq!(
            parse_timeout_secs("TIMEOUT", "30"),
            Ok(Duration::from_secs(30))
        );
        assert!(parse_timeout_secs("TIMEOUT", "0").is_err());
        assert!(parse_path("DIR", "   ").is_err());
        assert_eq!(parse_path("DIR", " bin "), Ok(PathBuf::from("bin")));
        assert!(parse_ip("ADDR", "localhost").is_err());
        assert!(parse_non_empty("LEVEL", "").is_err());
    }
}
