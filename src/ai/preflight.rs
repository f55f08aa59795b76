//! Configuration validation run before any network call.

use std::fmt;

use super::error::ConfigIssue;
use crate::config::InferenceConfig;

/// Everything the agent request needs, validated
#[derive(Clone, PartialEq, Eq)]
pub struct AgentTarget {
    pub api_key: String,
    pub app_name: String,
    pub db_attachment: String,
}

impl fmt::Debug for AgentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentTarget")
            .field("api_key", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("db_attachment", &self.db_attachment)
            .finish()
    }
}

/// The categorization path only needs a key.
pub fn check_credentials(config: &InferenceConfig) -> Result<String, ConfigIssue> {
    config.resolve_api_key().ok_or(ConfigIssue::MissingApiKey)
}

/// The insights path needs a key, a sandbox application and a follower
/// attachment.
pub fn check_agent_target(config: &InferenceConfig) -> Result<AgentTarget, ConfigIssue> {
    let api_key = check_credentials(config)?;
    let app_name = config.resolve_app_name().ok_or(ConfigIssue::MissingAppName)?;
    let db_attachment = config
        .db_attachment
        .as_ref()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .ok_or(ConfigIssue::MissingAttachment)?
        .to_string();

    if !config.attachment_is_follower {
        return Err(ConfigIssue::AttachmentNotFollower(db_attachment));
    }

    Ok(AgentTarget {
        api_key,
        app_name,
        db_attachment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_config() -> InferenceConfig {
        InferenceConfig {
            api_key: Some("inf-test".to_string()),
            api_key_env: Vec::new(),
            app_name: Some("sf-health-dashboard".to_string()),
            app_name_env: Vec::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ready() {
        let target = check_agent_target(&ready_config()).unwrap();
        assert_eq!(target.db_attachment, "HEROKU_POSTGRESQL_COBALT");
        assert!(!format!("{:?}", target).contains("inf-test"));
    }

    #[test]
    fn test_missing_key() {
        let config = InferenceConfig {
            api_key: None,
            ..ready_config()
        };
        assert_eq!(check_agent_target(&config), Err(ConfigIssue::MissingApiKey));
        assert_eq!(check_credentials(&config), Err(ConfigIssue::MissingApiKey));
    }

    #[test]
    fn test_missing_app_name() {
        let config = InferenceConfig {
            app_name: None,
            ..ready_config()
        };
        assert_eq!(check_agent_target(&config), Err(ConfigIssue::MissingAppName));
    }

    #[test]
    fn test_attachment_must_be_follower() {
        let config = InferenceConfig {
            attachment_is_follower: false,
            ..ready_config()
        };
        assert_eq!(
            check_agent_target(&config),
            Err(ConfigIssue::AttachmentNotFollower(
                "HEROKU_POSTGRESQL_COBALT".to_string()
            ))
        );

        let config = InferenceConfig {
            db_attachment: Some(" ".to_string()),
            ..ready_config()
        };
        assert_eq!(check_agent_target(&config), Err(ConfigIssue::MissingAttachment));
    }
}
