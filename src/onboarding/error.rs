use serde::Serialize;
use thiserror::Error;

use super::store::StoreError;

/// Failed-reason slugs recorded on failed onboarding tasks
pub mod fail_reason {
    pub const CONNECT: &str = "fail-connect";
    pub const LOGIN: &str = "fail-login";
    pub const UNSUPPORTED: &str = "fail-unsupported";
    pub const MISSING: &str = "fail-missing";
    pub const CONFLICT: &str = "fail-conflict";
    pub const STORE: &str = "fail-store";
    pub const EXECUTE: &str = "fail-execute";
    pub const CONFIG: &str = "fail-config";
}

/// Kind of inventory object, used in lookups and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Site,
    Manufacturer,
    Platform,
    DeviceType,
    DeviceRole,
    Device,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Site => "site",
            ObjectKind::Manufacturer => "manufacturer",
            ObjectKind::Platform => "platform",
            ObjectKind::DeviceType => "device type",
            ObjectKind::DeviceRole => "device role",
            ObjectKind::Device => "device",
        };
        f.write_str(name)
    }
}

/// Every way an onboarding attempt can fail
#[derive(Debug, Error)]
pub enum OnboardError {
    /// Host unreachable, DNS failure, or timeout
    #[error("device unreachable: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// Fingerprint was inconclusive or no driver is registered
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Referenced object is absent and creation is disabled
    #[error("{kind} not found: {name}")]
    MissingObject { kind: ObjectKind, name: String },

    /// Ambiguous match, or discovered data contradicts stored inventory
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Command ran but its output could not be used
    #[error("command execution failed: {0}")]
    Execute(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

impl OnboardError {
    pub fn missing(kind: ObjectKind, name: impl Into<String>) -> Self {
        OnboardError::MissingObject {
            kind,
            name: name.into(),
        }
    }

    /// Failed-reason slug for this error
    pub fn reason(&self) -> &'static str {
        match self {
            OnboardError::Connection(_) => fail_reason::CONNECT,
            OnboardError::Auth(_) => fail_reason::LOGIN,
            OnboardError::UnsupportedPlatform(_) => fail_reason::UNSUPPORTED,
            OnboardError::MissingObject { .. } => fail_reason::MISSING,
            OnboardError::Conflict(_) => fail_reason::CONFLICT,
            OnboardError::Store(_) => fail_reason::STORE,
            OnboardError::Execute(_) => fail_reason::EXECUTE,
            OnboardError::InvalidTarget(_) => fail_reason::CONFIG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_slugs() {
        assert_eq!(OnboardError::Connection("x".into()).reason(), "fail-connect");
        assert_eq!(OnboardError::Auth("x".into()).reason(), "fail-login");
        assert_eq!(
            OnboardError::missing(ObjectKind::DeviceType, "c9300").reason(),
            "fail-missing"
        );
        assert_eq!(
            OnboardError::Store(StoreError::UniqueViolation("x".into())).reason(),
            "fail-store"
        );
    }

    #[test]
    fn test_missing_object_message_names_kind() {
        let err = OnboardError::missing(ObjectKind::DeviceRole, "core");
        assert_eq!(err.to_string(), "device role not found: core");
    }
}
