//! Configuration validation
//!
//! Validates channelwarden configuration for correctness:
//! - Guild id is set
//! - Channel names are non-blank, unique, and in at most one list
//! - Schedule times parse and do not repeat
//! - Runtime limits are non-zero

use super::warden_config::WardenConfig;
use crate::warden::schedule::parse_time;
use crate::WardenError;
use std::collections::HashSet;

/// Validation error details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a channelwarden configuration, collecting every problem
pub fn validate_config(config: &WardenConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.guild_id == 0 {
        errors.push(ValidationError::new("guild_id", "Guild id must be set"));
    }

    validate_channel_list(
        "policy.send_allowed",
        &config.policy.send_allowed,
        &mut errors,
    );
    validate_channel_list(
        "policy.send_denied",
        &config.policy.send_denied,
        &mut errors,
    );

    let allowed: HashSet<&str> = config
        .policy
        .send_allowed
        .iter()
        .map(String::as_str)
        .collect();
    let mut reported = HashSet::new();
    for name in &config.policy.send_denied {
        if allowed.contains(name.as_str()) && reported.insert(name.as_str()) {
            errors.push(ValidationError::new(
                "policy",
                format!(
                    "Channel '{}' is listed as both send_allowed and send_denied",
                    name
                ),
            ));
        }
    }

    let mut seen_times = HashSet::new();
    for time in &config.schedule.times_utc {
        match parse_time(time) {
            Ok(parsed) => {
                if !seen_times.insert(parsed) {
                    errors.push(ValidationError::new(
                        "schedule.times_utc",
                        format!("Duplicate schedule time: {}", time),
                    ));
                }
            }
            Err(_) => errors.push(ValidationError::new(
                "schedule.times_utc",
                format!("Invalid time '{}'. Expected HH:MM", time),
            )),
        }
    }

    for (field, value) in [
        (
            "runtime.max_concurrent_writes",
            config.runtime.max_concurrent_writes,
        ),
        (
            "runtime.max_inflight_dispatches",
            config.runtime.max_inflight_dispatches,
        ),
        (
            "runtime.event_channel_capacity",
            config.runtime.event_channel_capacity,
        ),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "Must be at least 1"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_channel_list(field: &str, names: &[String], errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            errors.push(ValidationError::new(field, "Blank channel name"));
        } else if !seen.insert(name.as_str()) {
            errors.push(ValidationError::new(
                field,
                format!("Duplicate channel name: {}", name),
            ));
        }
    }
}

/// Validate and convert to a crate error
pub fn validate_config_result(config: &WardenConfig) -> crate::Result<()> {
    validate_config(config).map_err(WardenError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> WardenConfig {
        WardenConfig::new(1456211776495419493)
            .allow_send("mute_only")
            .deny_send("readonly")
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_empty_lists_are_valid() {
        assert!(validate_config(&WardenConfig::new(1)).is_ok());
    }

    #[test]
    fn test_missing_guild() {
        let mut config = valid();
        config.guild_id = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "guild_id");
    }

    #[test]
    fn test_overlapping_lists() {
        let config = valid().allow_send("readonly");

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'readonly'"));
    }

    #[test]
    fn test_blank_and_duplicate_names() {
        let config = valid().allow_send("  ").deny_send("readonly");

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["policy.send_allowed", "policy.send_denied"]);
    }

    #[test]
    fn test_bad_schedule_times() {
        let mut config = valid();
        config.schedule.times_utc = vec![
            "07:00".to_string(),
            "25:00".to_string(),
            "7:00".to_string(),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("25:00"));
        assert!(errors[1].message.contains("Duplicate"));
    }

    #[test]
    fn test_zero_limits() {
        let mut config = valid();
        config.runtime.max_concurrent_writes = 0;
        config.runtime.event_channel_capacity = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validate_config_result() {
        let config = valid().allow_send("readonly");
        let err = validate_config_result(&config).unwrap_err();
        assert!(matches!(err, WardenError::Validation(ref e) if e.len() == 1));
    }
}
