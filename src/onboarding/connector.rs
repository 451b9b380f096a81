use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::drivers::{CommandOutputs, DriverRegistry, PlatformDriver, StackMember, SHOW_VERSION};
use crate::utils::{is_cli_error, ssh_connect, ssh_exec, ssh_shell_exec, transcript_output, SshError};

use super::error::OnboardError;

/// Normalized identity of a live device
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceFingerprint {
    /// Platform family, e.g. "cisco_ios"
    pub platform: String,
    pub vendor: String,
    pub os_version: String,
    pub model: String,
    pub serial: String,
    pub hostname: String,
    pub stack_members: Vec<StackMember>,
    pub mgmt_interface: Option<String>,
    pub mgmt_prefix_length: Option<u8>,
}

/// Everything needed to open one management session
#[derive(Clone)]
pub struct ConnectParams {
    pub address: IpAddr,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Enable secret, for drivers with a privileged mode
    pub secret: Option<String>,
    pub timeout: Duration,
    /// Driver to use without probing, when registered
    pub driver_hint: Option<String>,
}

impl std::fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectParams")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .field("driver_hint", &self.driver_hint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn identify(&self, params: &ConnectParams) -> Result<DeviceFingerprint, OnboardError>;
}

/// A command-line session on a device
pub trait CliSession {
    fn run(&mut self, command: &str) -> Result<String, OnboardError>;

    /// Run every later command in privileged mode
    fn enable(&mut self, command: &str, secret: &str) -> Result<(), OnboardError>;
}

impl From<SshError> for OnboardError {
    fn from(e: SshError) -> Self {
        match e {
            SshError::Connect(msg) => OnboardError::Connection(msg),
            SshError::Auth(msg) => OnboardError::Auth(msg),
        }
    }
}

struct SshCli {
    session: ssh2::Session,
    /// Enable command and secret; exec channels do not keep privilege
    /// between commands, so a privileged session replays them in a shell
    enable: Option<(String, String)>,
}

impl CliSession for SshCli {
    fn run(&mut self, command: &str) -> Result<String, OnboardError> {
        let Some((enable, secret)) = &self.enable else {
            return Ok(ssh_exec(&self.session, command)?);
        };
        let transcript = ssh_shell_exec(
            &self.session,
            &[enable.as_str(), secret.as_str(), "terminal length 0", command, "exit"],
        )?;
        Ok(transcript_output(&transcript, command))
    }

    fn enable(&mut self, command: &str, secret: &str) -> Result<(), OnboardError> {
        self.enable = Some((command.to_string(), secret.to_string()));
        Ok(())
    }
}

impl Drop for SshCli {
    fn drop(&mut self) {
        let _ = self.session.disconnect(None, "onboarding complete", None);
    }
}

/// Connector that logs in over SSH and fingerprints with the driver registry
pub struct SshConnector {
    registry: Arc<DriverRegistry>,
}

impl SshConnector {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl DeviceConnector for SshConnector {
    async fn identify(&self, params: &ConnectParams) -> Result<DeviceFingerprint, OnboardError> {
        let registry = self.registry.clone();
        let params = params.clone();

        tokio::task::spawn_blocking(move || -> Result<DeviceFingerprint, OnboardError> {
            let addr = SocketAddr::new(params.address, params.port);
            let session = ssh_connect(addr, &params.username, &params.password, params.timeout)?;
            tracing::debug!("SSH session established with {}", addr);
            let mut cli = SshCli { session, enable: None };
            fingerprint_device(&mut cli, &registry, &params)
        })
        .await
        .map_err(|e| OnboardError::Execute(format!("Task join error: {}", e)))?
    }
}

/// Pick a driver (hint first, then detection from `show version`), run its
/// commands and normalize the parsed facts.
pub fn fingerprint_device(
    cli: &mut dyn CliSession,
    registry: &DriverRegistry,
    params: &ConnectParams,
) -> Result<DeviceFingerprint, OnboardError> {
    let mut outputs = CommandOutputs::default();

    let hinted = params.driver_hint.as_deref().and_then(|name| registry.get(name));
    let driver: Arc<dyn PlatformDriver> = match hinted {
        Some(driver) => driver,
        None => {
            let banner = cli.run(SHOW_VERSION)?;
            let driver = registry.detect(&banner)?;
            outputs.insert(SHOW_VERSION, banner);
            driver
        }
    };
    tracing::debug!("Using {} driver for {}", driver.platform(), params.address);

    let secret = params.secret.as_deref().filter(|s| !s.is_empty());
    if let (Some(command), Some(secret)) = (driver.enable_command(), secret) {
        cli.enable(command, secret)?;
    }

    for command in driver.commands() {
        if outputs.get(command).is_some() {
            continue;
        }
        let output = cli.run(command)?;
        if is_cli_error(&output) || output.trim().is_empty() {
            tracing::debug!("'{}' not usable on {}", command, params.address);
            continue;
        }
        outputs.insert(command, output);
    }

    let facts = driver.parse(&outputs)?;

    let mgmt = match params.address {
        IpAddr::V4(v4) => facts.interfaces.iter().find(|i| i.address == v4),
        IpAddr::V6(_) => None,
    };

    Ok(DeviceFingerprint {
        platform: driver.platform().to_string(),
        vendor: driver.vendor().to_string(),
        os_version: facts.os_version,
        model: facts.model,
        serial: facts.serial,
        hostname: facts.hostname,
        stack_members: facts.stack_members,
        mgmt_interface: mgmt.map(|i| i.name.clone()),
        mgmt_prefix_length: mgmt.map(|i| i.prefix_length),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Session replaying canned command output
    struct ScriptedCli {
        responses: HashMap<&'static str, String>,
        ran: Vec<String>,
        enabled_with: Option<(String, String)>,
    }

    impl ScriptedCli {
        fn new(responses: &[(&'static str, &str)]) -> Self {
            Self {
                responses: responses.iter().map(|(k, v)| (*k, v.to_string())).collect(),
                ran: Vec::new(),
                enabled_with: None,
            }
        }
    }

    impl CliSession for ScriptedCli {
        fn run(&mut self, command: &str) -> Result<String, OnboardError> {
            self.ran.push(command.to_string());
            Ok(self
                .responses
                .get(command)
                .cloned()
                .unwrap_or_else(|| "% Invalid input detected at '^' marker.".to_string()))
        }

        fn enable(&mut self, command: &str, secret: &str) -> Result<(), OnboardError> {
            self.enabled_with = Some((command.to_string(), secret.to_string()));
            Ok(())
        }
    }

    fn params(address: &str, hint: Option<&str>) -> ConnectParams {
        ConnectParams {
            address: address.parse().unwrap(),
            port: 22,
            username: "admin".to_string(),
            password: "secret".to_string(),
            secret: None,
            timeout: Duration::from_secs(5),
            driver_hint: hint.map(str::to_string),
        }
    }

    const IOS_VERSION: &str = "\
Cisco IOS Software, C3750 Software (C3750-IPSERVICESK9-M), Version 15.0(2)SE11, RELEASE SOFTWARE (fc3)
nyc01-sw01 uptime is 1 year, 2 weeks
cisco WS-C3750G-48PS (PowerPC405) processor (revision C0) with 131072K bytes of memory.
Processor board ID FOC0948Y2RB
";

    #[test]
    fn test_banner_detects_and_finds_mgmt_interface() {
        let mut cli = ScriptedCli::new(&[
            ("show version", IOS_VERSION),
            (
                "show ip interface",
                "Vlan100 is up, line protocol is up\n  Internet address is 198.51.100.5/26\n",
            ),
        ]);
        let registry = DriverRegistry::with_defaults();
        let fp = fingerprint_device(&mut cli, &registry, &params("198.51.100.5", None)).unwrap();

        assert_eq!(fp.platform, "cisco_ios");
        assert_eq!(fp.vendor, "Cisco");
        assert_eq!(fp.hostname, "nyc01-sw01");
        assert_eq!(fp.model, "WS-C3750G-48PS");
        assert_eq!(fp.mgmt_interface.as_deref(), Some("Vlan100"));
        assert_eq!(fp.mgmt_prefix_length, Some(26));
        // show version output is reused, not fetched twice
        assert_eq!(cli.ran, vec!["show version", "show ip interface"]);
    }

    #[test]
    fn test_no_matching_interface_leaves_mgmt_empty() {
        let mut cli = ScriptedCli::new(&[("show version", IOS_VERSION)]);
        let registry = DriverRegistry::with_defaults();
        let fp = fingerprint_device(&mut cli, &registry, &params("203.0.113.9", None)).unwrap();
        assert!(fp.mgmt_interface.is_none());
        assert!(fp.mgmt_prefix_length.is_none());
    }

    #[test]
    fn test_unknown_banner_is_unsupported() {
        let mut cli = ScriptedCli::new(&[("show version", "Linux host 6.1.0 x86_64")]);
        let registry = DriverRegistry::with_defaults();
        let err = fingerprint_device(&mut cli, &registry, &params("192.0.2.1", None)).unwrap_err();
        assert!(matches!(err, OnboardError::UnsupportedPlatform(_)));
    }

    #[test]
    fn test_driver_hint_skips_banner_detection() {
        let mut cli = ScriptedCli::new(&[
            ("show version", "Arista vEOS\nSerial number: ABC\n"),
            ("show hostname", "Hostname: leaf9\n"),
        ]);
        let registry = DriverRegistry::with_defaults();
        let fp = fingerprint_device(&mut cli, &registry, &params("192.0.2.1", Some("arista_eos"))).unwrap();
        assert_eq!(fp.platform, "arista_eos");
        assert_eq!(fp.hostname, "leaf9");
        assert_eq!(fp.model, "vEOS");
    }

    #[test]
    fn test_unregistered_hint_falls_back_to_banner() {
        let mut cli = ScriptedCli::new(&[("show version", IOS_VERSION)]);
        let registry = DriverRegistry::with_defaults();
        let fp = fingerprint_device(&mut cli, &registry, &params("192.0.2.1", Some("ios"))).unwrap();
        assert_eq!(fp.platform, "cisco_ios");
    }

    #[test]
    fn test_secret_enters_enable_mode_on_ios() {
        let mut cli = ScriptedCli::new(&[("show version", IOS_VERSION)]);
        let registry = DriverRegistry::with_defaults();
        let mut p = params("192.0.2.1", None);
        p.secret = Some("en-pass".to_string());
        fingerprint_device(&mut cli, &registry, &p).unwrap();
        assert_eq!(cli.enabled_with, Some(("enable".to_string(), "en-pass".to_string())));
    }

    #[test]
    fn test_secret_ignored_without_privileged_mode() {
        let mut cli = ScriptedCli::new(&[(
            "show version",
            "Hostname: edge1\nModel: mx204\nJunos: 21.4R3.15\n",
        )]);
        let registry = DriverRegistry::with_defaults();
        let mut p = params("192.0.2.1", Some("juniper_junos"));
        p.secret = Some("en-pass".to_string());
        let _ = fingerprint_device(&mut cli, &registry, &p);
        assert!(cli.enabled_with.is_none());
    }

    #[test]
    fn test_no_secret_stays_unprivileged() {
        let mut cli = ScriptedCli::new(&[("show version", IOS_VERSION)]);
        let registry = DriverRegistry::with_defaults();
        fingerprint_device(&mut cli, &registry, &params("192.0.2.1", None)).unwrap();
        assert!(cli.enabled_with.is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let mut p = params("192.0.2.1", None);
        p.secret = Some("en-pass".to_string());
        let out = format!("{:?}", p);
        assert!(!out.contains("secret"));
        assert!(!out.contains("en-pass"));
    }
}
