use regex_lite::Regex;

use crate::onboarding::OnboardError;

use super::{capture, interface_address, CommandOutputs, InterfaceAddress, ParsedFacts, PlatformDriver, SHOW_VERSION};

const SHOW_CHASSIS_HARDWARE: &str = "show chassis hardware";
const SHOW_INTERFACES_TERSE: &str = "show interfaces terse";

/// Juniper Junos
pub struct JuniperJunos;

impl PlatformDriver for JuniperJunos {
    fn platform(&self) -> &'static str {
        "juniper_junos"
    }

    fn vendor(&self) -> &'static str {
        "Juniper"
    }

    fn detect(&self, version_output: &str) -> bool {
        version_output.contains("JUNOS") || version_output.contains("Junos:")
    }

    fn commands(&self) -> &'static [&'static str] {
        &[SHOW_VERSION, SHOW_CHASSIS_HARDWARE, SHOW_INTERFACES_TERSE]
    }

    fn parse(&self, outputs: &CommandOutputs) -> Result<ParsedFacts, OnboardError> {
        let version = outputs.require(SHOW_VERSION)?;
        let hostname = capture(r"^Hostname:\s*(\S+)", version)
            .ok_or_else(|| OnboardError::Execute("hostname missing from show version".to_string()))?;

        Ok(ParsedFacts {
            hostname,
            model: capture(r"^Model:\s*(\S+)", version).unwrap_or_default(),
            serial: outputs
                .get(SHOW_CHASSIS_HARDWARE)
                .and_then(|out| capture(r"^Chassis\s+(\S+)\s+\S", out))
                .unwrap_or_default(),
            os_version: capture(r"^Junos:\s*(\S+)", version)
                .or_else(|| capture(r"^JUNOS .*\[(\S+)\]", version))
                .unwrap_or_default(),
            stack_members: Vec::new(),
            interfaces: outputs
                .get(SHOW_INTERFACES_TERSE)
                .map(parse_terse_interfaces)
                .unwrap_or_default(),
        })
    }
}

/// inet rows of `show interfaces terse`; continuation rows carry no name
fn parse_terse_interfaces(output: &str) -> Vec<InterfaceAddress> {
    let (Some(named), Some(continued)) = (
        Regex::new(r"^(\S+)\s+(?:up|down)\s+(?:up|down)(?:\s+(\S+)\s+(\d+\.\d+\.\d+\.\d+)/(\d+))?").ok(),
        Regex::new(r"^\s+(\S+)\s+(\d+\.\d+\.\d+\.\d+)/(\d+)").ok(),
    ) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut current: Option<String> = None;
    for line in output.lines() {
        if let Some(caps) = named.captures(line) {
            current = Some(caps[1].to_string());
            if let (Some(proto), Some(ip), Some(len)) = (caps.get(2), caps.get(3), caps.get(4)) {
                if proto.as_str() == "inet" {
                    found.extend(interface_address(&caps[1], ip.as_str(), len.as_str()));
                }
            }
            continue;
        }
        if let (Some(name), Some(caps)) = (current.as_ref(), continued.captures(line)) {
            if &caps[1] == "inet" {
                found.extend(interface_address(name, &caps[2], &caps[3]));
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_junos_facts() {
        let mut outputs = CommandOutputs::default();
        outputs.insert(
            SHOW_VERSION,
            "Hostname: edge-mx1\nModel: mx240\nJunos: 18.2R1.9\nJUNOS OS Kernel 64-bit  [20180614.6c3f819_builder_stable_11]\n"
                .to_string(),
        );
        outputs.insert(
            SHOW_CHASSIS_HARDWARE,
            "Hardware inventory:
Item             Version  Part number  Serial number     Description
Chassis                                JN11FD2C5AFA      MX240
Midplane         REV 07   750-021157   ACRB9287          Lower Backplane
"
            .to_string(),
        );
        outputs.insert(
            SHOW_INTERFACES_TERSE,
            "Interface               Admin Link Proto    Local                 Remote
ge-0/0/0                up    up
ge-0/0/0.0              up    up   inet     10.0.0.1/30
                                   inet6    fe80::1/64
fxp0                    up    up
fxp0.0                  up    up   inet     192.0.2.30/24
lo0.0                   up    up   inet     10.255.0.1          --> 0/0
                                   inet     10.255.0.2/32
"
            .to_string(),
        );

        let facts = JuniperJunos.parse(&outputs).unwrap();
        assert_eq!(facts.hostname, "edge-mx1");
        assert_eq!(facts.model, "mx240");
        assert_eq!(facts.os_version, "18.2R1.9");
        assert_eq!(facts.serial, "JN11FD2C5AFA");

        let names: Vec<&str> = facts.interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ge-0/0/0.0", "fxp0.0", "lo0.0"]);
        assert_eq!(facts.interfaces[1].prefix_length, 24);
        assert_eq!(facts.interfaces[2].prefix_length, 32);
    }

    #[test]
    fn test_legacy_version_banner() {
        let mut outputs = CommandOutputs::default();
        outputs.insert(
            SHOW_VERSION,
            "Hostname: ex1\nModel: ex4200-48t\nJUNOS Base OS boot [12.1X46-D10.2]\n".to_string(),
        );
        let facts = JuniperJunos.parse(&outputs).unwrap();
        assert_eq!(facts.os_version, "12.1X46-D10.2");
        assert!(facts.serial.is_empty());
    }
}
