//! Platform drivers: the command set and output parsers for each supported
//! network OS family, plus the registry that selects one at runtime.

mod arista_eos;
mod cisco_ios;
mod cisco_nxos;
mod cisco_xr;
mod juniper_junos;

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use regex_lite::Regex;
use serde::Serialize;

use crate::onboarding::OnboardError;

pub use arista_eos::AristaEos;
pub use cisco_ios::CiscoIos;
pub use cisco_nxos::CiscoNxos;
pub use cisco_xr::CiscoXr;
pub use juniper_junos::JuniperJunos;

/// Command every driver understands; its output identifies the family
pub const SHOW_VERSION: &str = "show version";

/// One physical member of a stack or virtual chassis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackMember {
    pub index: u32,
    pub model: String,
    pub serial: String,
}

/// An IPv4 address configured on a device interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub address: Ipv4Addr,
    pub prefix_length: u8,
}

/// Raw output of the commands run against a device, keyed by command
#[derive(Debug, Default, Clone)]
pub struct CommandOutputs {
    outputs: HashMap<String, String>,
}

impl CommandOutputs {
    pub fn insert(&mut self, command: &str, output: String) {
        self.outputs.insert(command.to_string(), output);
    }

    pub fn get(&self, command: &str) -> Option<&str> {
        self.outputs.get(command).map(String::as_str)
    }

    /// Output of a command the driver cannot do without
    pub fn require(&self, command: &str) -> Result<&str, OnboardError> {
        self.get(command).ok_or_else(|| {
            OnboardError::Execute(format!("command '{}' returned no usable output", command))
        })
    }
}

/// Facts a driver extracts from its command outputs
#[derive(Debug, Clone, Default)]
pub struct ParsedFacts {
    pub hostname: String,
    pub model: String,
    pub serial: String,
    pub os_version: String,
    pub stack_members: Vec<StackMember>,
    pub interfaces: Vec<InterfaceAddress>,
}

pub trait PlatformDriver: Send + Sync {
    /// Platform family identifier, e.g. "cisco_ios"
    fn platform(&self) -> &'static str;

    /// Manufacturer name reported for devices of this family
    fn vendor(&self) -> &'static str;

    /// Whether `show version` output belongs to this family
    fn detect(&self, version_output: &str) -> bool;

    /// Commands to run for fact collection, `show version` included
    fn commands(&self) -> &'static [&'static str];

    /// Command that enters privileged mode, for families that have one
    fn enable_command(&self) -> Option<&'static str> {
        None
    }

    fn parse(&self, outputs: &CommandOutputs) -> Result<ParsedFacts, OnboardError>;
}

/// Maps platform identifiers to drivers
pub struct DriverRegistry {
    drivers: Vec<Arc<dyn PlatformDriver>>,
}

impl DriverRegistry {
    pub fn empty() -> Self {
        Self { drivers: Vec::new() }
    }

    /// Registry with every built-in driver.
    /// IOS XR is registered before IOS so the more specific banner wins.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(CiscoXr));
        registry.register(Arc::new(CiscoNxos));
        registry.register(Arc::new(CiscoIos));
        registry.register(Arc::new(AristaEos));
        registry.register(Arc::new(JuniperJunos));
        registry
    }

    pub fn register(&mut self, driver: Arc<dyn PlatformDriver>) {
        self.drivers.retain(|d| d.platform() != driver.platform());
        self.drivers.push(driver);
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn PlatformDriver>> {
        self.drivers
            .iter()
            .find(|d| d.platform() == platform)
            .cloned()
    }

    /// Select the driver for a `show version` banner
    pub fn detect(&self, version_output: &str) -> Result<Arc<dyn PlatformDriver>, OnboardError> {
        self.drivers
            .iter()
            .find(|d| d.detect(version_output))
            .cloned()
            .ok_or_else(|| {
                let first_line = version_output
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or("<empty>");
                OnboardError::UnsupportedPlatform(format!(
                    "no driver recognizes device banner '{}'",
                    first_line
                ))
            })
    }

    pub fn platforms(&self) -> Vec<&'static str> {
        self.drivers.iter().map(|d| d.platform()).collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ========== Shared parsing helpers ==========

/// First capture group of a multi-line pattern, trimmed
pub(crate) fn capture(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(&format!("(?m){}", pattern)).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse "X is up, line protocol is up" blocks followed by an indented
/// "Internet address is a.b.c.d/len" line (IOS, EOS and IOS XR style).
pub(crate) fn parse_internet_address_blocks(output: &str) -> Vec<InterfaceAddress> {
    let header = match Regex::new(r"^(\S+) is (?:up|down|administratively down|Up|Down|Shutdown)") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let address = match Regex::new(r"^\s+Internet address is (\d+\.\d+\.\d+\.\d+)/(\d+)") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut found = Vec::new();
    let mut current: Option<String> = None;
    for line in output.lines() {
        if let Some(caps) = header.captures(line) {
            current = Some(caps[1].to_string());
            continue;
        }
        let Some(name) = current.as_ref() else { continue };
        if let Some(caps) = address.captures(line) {
            if let Some(addr) = interface_address(name, &caps[1], &caps[2]) {
                found.push(addr);
            }
        }
    }
    found
}

pub(crate) fn interface_address(name: &str, address: &str, prefix_length: &str) -> Option<InterfaceAddress> {
    let address = address.parse::<Ipv4Addr>().ok()?;
    let prefix_length = prefix_length.parse::<u8>().ok().filter(|p| *p <= 32)?;
    Some(InterfaceAddress {
        name: name.to_string(),
        address,
        prefix_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_picks_family_by_banner() {
        let registry = DriverRegistry::with_defaults();
        let cases = [
            ("Cisco IOS XR Software, Version 7.3.2", "cisco_xr"),
            ("Cisco IOS Software, C3750E Software (C3750E-UNIVERSALK9-M), Version 15.2(4)E7", "cisco_ios"),
            ("Cisco IOS XE Software, Version 17.03.04a", "cisco_ios"),
            ("Cisco Nexus Operating System (NX-OS) Software", "cisco_nxos"),
            ("Arista DCS-7050TX-64-R\nHardware version: 01.11", "arista_eos"),
            ("Hostname: r1\nModel: mx240\nJunos: 18.2R1.9", "juniper_junos"),
        ];
        for (banner, expected) in cases {
            let driver = registry.detect(banner).unwrap();
            assert_eq!(driver.platform(), expected, "banner: {}", banner);
        }
    }

    #[test]
    fn test_unknown_banner_is_unsupported() {
        let registry = DriverRegistry::with_defaults();
        let err = registry.detect("\nLinux r1 5.15.0 #1 SMP x86_64 GNU/Linux").err().unwrap();
        assert_eq!(err.reason(), "fail-unsupported");
        assert!(err.to_string().contains("Linux r1"));
    }

    #[test]
    fn test_get_and_register() {
        let mut registry = DriverRegistry::empty();
        assert!(registry.get("cisco_ios").is_none());
        registry.register(Arc::new(CiscoIos));
        registry.register(Arc::new(CiscoIos));
        assert_eq!(registry.platforms(), vec!["cisco_ios"]);
        assert_eq!(registry.get("cisco_ios").unwrap().vendor(), "Cisco");
    }

    #[test]
    fn test_parse_internet_address_blocks() {
        let output = "\
GigabitEthernet0/0 is up, line protocol is up
  Internet address is 198.51.100.5/24
  Broadcast address is 255.255.255.255
GigabitEthernet0/1 is administratively down, line protocol is down
  Internet protocol processing disabled
Loopback0 is up, line protocol is up
  Internet address is 10.255.0.1/32
";
        let found = parse_internet_address_blocks(output);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "GigabitEthernet0/0");
        assert_eq!(found[0].address, Ipv4Addr::new(198, 51, 100, 5));
        assert_eq!(found[0].prefix_length, 24);
        assert_eq!(found[1].name, "Loopback0");
    }

    #[test]
    fn test_require_missing_output() {
        let outputs = CommandOutputs::default();
        let err = outputs.require("show inventory").unwrap_err();
        assert_eq!(err.reason(), "fail-execute");
    }
}
