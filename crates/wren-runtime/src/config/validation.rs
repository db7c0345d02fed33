//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, WrenConfig};
use crate::runtime::{EngineKind, MemoryKind};

/// Validates the entire configuration.
pub fn validate_config(config: &WrenConfig) -> ConfigResult<()> {
    let engine = EngineKind::parse(&config.bot.engine)?;
    MemoryKind::parse(&config.bot.memory)?;

    if engine == EngineKind::Slack
        && let Some(missing) = config.slack.missing_credentials().first()
    {
        return Err(ConfigError::missing_field(*missing));
    }

    let thresholds = &config.dispatch.thresholds;
    for (name, value) in [("direct", thresholds.direct), ("ambient", thresholds.ambient)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::validation(format!(
                "dispatch.thresholds.{name} must be between 0 and 1, got {value}"
            )));
        }
    }

    if config.web.enabled && config.web.port == 0 {
        return Err(ConfigError::validation("web.port must be greater than 0"));
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if config.slack.reconnect.multiplier < 1.0 {
        return Err(ConfigError::validation(
            "slack.reconnect.multiplier must be at least 1.0",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&WrenConfig::default()).is_ok());
    }

    #[test]
    fn test_unknown_engine() {
        let mut config = WrenConfig::default();
        config.bot.engine = "irc".into();
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidEngine(_))));
    }

    #[test]
    fn test_slack_requires_tokens() {
        let mut config = WrenConfig::default();
        config.bot.engine = "slack".into();
        let err = validate_config(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required configuration field: SLACK_TOKEN"
        );

        config.slack.token = "xoxb-1".into();
        config.slack.app_token = "xapp-1".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_threshold_range() {
        let mut config = WrenConfig::default();
        config.dispatch.thresholds.ambient = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = WrenConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
    }
}
