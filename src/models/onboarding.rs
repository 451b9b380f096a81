use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical onboarding task status values
pub mod task_status {
    pub const PENDING: &str = "pending";
    pub const SUCCEEDED: &str = "succeeded";
    pub const FAILED: &str = "failed";
    /// Onboarding is disabled for the device the target already belongs to
    pub const SKIPPED: &str = "skipped";
}

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u64 {
    30
}

/// Device login credentials. Never serialized and redacted from debug output.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Enable (privileged mode) secret
    #[serde(default)]
    pub secret: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Fill any field missing from `self` with the value from `defaults`.
    /// Empty strings count as missing.
    pub fn merged_over(&self, defaults: &Credentials) -> Credentials {
        fn pick(own: &Option<String>, fallback: &Option<String>) -> Option<String> {
            own.clone()
                .filter(|s| !s.is_empty())
                .or_else(|| fallback.clone().filter(|s| !s.is_empty()))
        }
        Credentials {
            username: pick(&self.username, &defaults.username),
            password: pick(&self.password, &defaults.password),
            secret: pick(&self.secret, &defaults.secret),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("*Credentials argument hidden*")
    }
}

/// OnboardingRequest submitted by a caller; immutable once accepted
#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingRequest {
    /// IP address or DNS name of the device
    pub target: String,
    /// Site slug
    pub site: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub stack_separator: Option<char>,
    /// Operator who submitted the request, taken from the API token
    #[serde(skip)]
    pub requested_by: Option<String>,
}

impl OnboardingRequest {
    pub fn new(target: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            site: site.into(),
            platform: None,
            device_type: None,
            role: None,
            credentials: None,
            port: default_port(),
            timeout: default_timeout(),
            stack_separator: None,
            requested_by: None,
        }
    }
}

/// OnboardingTask records one onboarding attempt and its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingTask {
    pub id: String,
    pub target: String,
    /// Address the target resolved to, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub site: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub port: u16,
    pub timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_separator: Option<char>,
    pub status: String, // pending, succeeded, failed, skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_device_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnboardingTask {
    /// Rebuild the submitted request. Credentials are not persisted, so
    /// the rebuilt request always falls back to the configured defaults.
    pub fn to_request(&self) -> OnboardingRequest {
        OnboardingRequest {
            target: self.target.clone(),
            site: self.site.clone(),
            platform: self.platform.clone(),
            device_type: self.device_type.clone(),
            role: self.role.clone(),
            credentials: None,
            port: self.port,
            timeout: self.timeout,
            stack_separator: self.stack_separator,
            requested_by: self.requested_by.clone(),
        }
    }

    /// A task that exists only in memory, used when the task store itself
    /// cannot record the attempt.
    pub fn unrecorded(id: &str, req: &OnboardingRequest) -> Self {
        Self {
            id: id.to_string(),
            target: req.target.clone(),
            ip_address: None,
            site: req.site.clone(),
            platform: req.platform.clone(),
            device_type: req.device_type.clone(),
            role: req.role.clone(),
            port: req.port,
            timeout: req.timeout,
            stack_separator: req.stack_separator,
            status: task_status::PENDING.to_string(),
            failed_reason: None,
            message: String::new(),
            created_device_id: None,
            requested_by: req.requested_by.clone(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != task_status::PENDING
    }
}

/// Filters for the task list; every field narrows the result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub site: Option<String>,
    pub platform: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub failed_reason: Option<String>,
    pub requested_by: Option<String>,
    /// Free-text search over id, target, address, site, platform, status,
    /// failure reason and message
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Onboarding state of one inventory device. Attempt dates and status are
/// derived from the tasks that touched the device.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingDevice {
    pub device_id: i64,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check_attempt_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check_successful_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOnboardingDeviceRequest {
    pub enabled: bool,
}
