use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// An http(s) site root such as `https://es.whoscored.com`; page URLs are
/// built by appending `/Matches/...` to it.
pub fn validate_base_url(field_name: &str, url_str: &str) -> Result<()> {
    let invalid = |reason: String| EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: url_str.to_string(),
        reason,
    };

    let url = Url::parse(url_str).map_err(|e| invalid(format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(invalid(format!("Unsupported URL scheme: {}", scheme))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("Use the site root without query or fragment".to_string()));
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() || path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path must be non-empty and free of null bytes".to_string(),
        });
    }
    Ok(())
}

/// Blank settings count as missing.
pub fn validate_required(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Random pause bounds between match fetches, in seconds.
pub fn validate_pause_window(min_secs: f64, max_secs: f64) -> Result<()> {
    validate_range("batch.pause_min_secs", min_secs, 0.0, 600.0)?;
    validate_range("batch.pause_max_secs", max_secs, 0.0, 600.0)?;
    if max_secs < min_secs {
        return Err(EtlError::ConfigValidationError {
            field: "batch.pause_max_secs".to_string(),
            message: format!("must not be below pause_min_secs ({})", min_secs),
        });
    }
    Ok(())
}

/// `--from/--to` fixtures window; both ends inclusive.
pub fn validate_date_range(from: NaiveDate, to: NaiveDate) -> Result<()> {
    if from > to {
        return Err(EtlError::ValidationError {
            message: format!("--from {} is after --to {}", from, to),
        });
    }
    Ok(())
}

/// WhoScored match ids are positive integers.
pub fn validate_match_id(match_id: i64) -> Result<()> {
    if match_id <= 0 {
        return Err(EtlError::ValidationError {
            message: format!("match id must be positive, got {}", match_id),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("fetch.base_url", "https://es.whoscored.com").is_ok());
        assert!(validate_base_url("fetch.base_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_base_url("fetch.base_url", "").is_err());
        assert!(validate_base_url("fetch.base_url", "whoscored").is_err());
        assert!(validate_base_url("fetch.base_url", "ftp://es.whoscored.com").is_err());
        assert!(validate_base_url("fetch.base_url", "https://es.whoscored.com/?lang=es").is_err());
    }

    #[test]
    fn test_blank_setting_is_missing() {
        assert!(matches!(
            validate_required("fetch.user_agent", "  "),
            Err(EtlError::MissingConfigError { .. })
        ));
        assert!(validate_required("fetch.user_agent", "Mozilla/5.0").is_ok());
    }

    #[test]
    fn test_pause_window() {
        assert!(validate_pause_window(1.2, 2.8).is_ok());
        assert!(validate_pause_window(2.0, 2.0).is_ok());
        assert!(matches!(
            validate_pause_window(3.0, 1.0),
            Err(EtlError::ConfigValidationError { .. })
        ));
        assert!(validate_pause_window(-1.0, 2.0).is_err());
    }

    #[test]
    fn test_date_range_and_match_id() {
        let aug = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let sep = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
        assert!(validate_date_range(aug, sep).is_ok());
        assert!(validate_date_range(aug, aug).is_ok());
        assert!(validate_date_range(sep, aug).is_err());

        assert!(validate_match_id(1913916).is_ok());
        assert!(validate_match_id(0).is_err());
        assert!(validate_match_id(-4).is_err());
    }
}
