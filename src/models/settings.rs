use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How discovered values are matched against existing inventory objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Exact slug only
    Strict,
    /// Exact slug, then case-insensitive slug and secondary keys
    #[default]
    Loose,
}

/// OnboardingPolicy holds the persisted onboarding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingPolicy {
    pub create_platform_if_missing: bool,
    pub create_manufacturer_if_missing: bool,
    pub create_device_type_if_missing: bool,
    pub create_device_role_if_missing: bool,
    pub create_management_interface_if_missing: bool,
    pub skip_device_type_on_update: bool,
    pub skip_manufacturer_on_update: bool,
    pub default_device_role: String,
    pub default_device_role_color: String,
    pub default_device_status: String,
    pub default_management_interface: String,
    pub default_management_prefix_length: u8,
    pub object_match_strategy: MatchStrategy,
    /// Detected platform family -> platform slug
    pub platform_map: HashMap<String, String>,
    pub stack_separator: char,
}

impl Default for OnboardingPolicy {
    fn default() -> Self {
        Self {
            create_platform_if_missing: true,
            create_manufacturer_if_missing: true,
            create_device_type_if_missing: true,
            create_device_role_if_missing: true,
            create_management_interface_if_missing: true,
            skip_device_type_on_update: false,
            skip_manufacturer_on_update: false,
            default_device_role: "network".to_string(),
            default_device_role_color: "ff0000".to_string(),
            default_device_status: "active".to_string(),
            default_management_interface: "PLACEHOLDER".to_string(),
            default_management_prefix_length: 0,
            object_match_strategy: MatchStrategy::Loose,
            platform_map: HashMap::new(),
            stack_separator: ':',
        }
    }
}

impl OnboardingPolicy {
    /// Check values that the API accepts but the reconciler cannot use
    pub fn validate(&self) -> Result<(), String> {
        if self.default_device_role.trim().is_empty() {
            return Err("default_device_role must not be empty".to_string());
        }
        if self.default_device_status.trim().is_empty() {
            return Err("default_device_status must not be empty".to_string());
        }
        if self.default_management_interface.trim().is_empty() {
            return Err("default_management_interface must not be empty".to_string());
        }
        if self.default_management_prefix_length > 32 {
            return Err("default_management_prefix_length must be between 0 and 32".to_string());
        }
        let color = &self.default_device_role_color;
        if color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("default_device_role_color must be 6 hex digits".to_string());
        }
        if self.stack_separator.is_alphanumeric() || self.stack_separator.is_whitespace() {
            return Err("stack_separator must be a punctuation character".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(OnboardingPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let policy: OnboardingPolicy =
            serde_json::from_str(r#"{"object_match_strategy":"strict","stack_separator":"_"}"#).unwrap();
        assert_eq!(policy.object_match_strategy, MatchStrategy::Strict);
        assert_eq!(policy.stack_separator, '_');
        assert!(policy.create_platform_if_missing);
        assert_eq!(policy.default_management_interface, "PLACEHOLDER");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut policy = OnboardingPolicy::default();
        policy.default_management_prefix_length = 33;
        assert!(policy.validate().is_err());

        let mut policy = OnboardingPolicy::default();
        policy.default_device_role_color = "red".to_string();
        assert!(policy.validate().is_err());

        let mut policy = OnboardingPolicy::default();
        policy.stack_separator = 'x';
        assert!(policy.validate().is_err());
    }
}
