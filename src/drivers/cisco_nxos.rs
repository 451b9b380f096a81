use regex_lite::Regex;

use crate::onboarding::OnboardError;

use super::{capture, interface_address, CommandOutputs, InterfaceAddress, ParsedFacts, PlatformDriver, SHOW_VERSION};

const SHOW_IP_INTERFACE_VRF_ALL: &str = "show ip interface vrf all";

/// Cisco Nexus (NX-OS)
pub struct CiscoNxos;

impl PlatformDriver for CiscoNxos {
    fn platform(&self) -> &'static str {
        "cisco_nxos"
    }

    fn vendor(&self) -> &'static str {
        "Cisco"
    }

    fn detect(&self, version_output: &str) -> bool {
        version_output.contains("NX-OS") || version_output.contains("Cisco Nexus Operating System")
    }

    fn commands(&self) -> &'static [&'static str] {
        &[SHOW_VERSION, SHOW_IP_INTERFACE_VRF_ALL]
    }

    fn parse(&self, outputs: &CommandOutputs) -> Result<ParsedFacts, OnboardError> {
        let version = outputs.require(SHOW_VERSION)?;

        let hostname = capture(r"^\s*Device name:\s*(\S+)", version)
            .ok_or_else(|| OnboardError::Execute("device name missing from show version".to_string()))?;

        Ok(ParsedFacts {
            hostname,
            model: capture(r"^\s*cisco Nexus\S*\s+(\S+)", version).unwrap_or_default(),
            serial: capture(r"Processor [Bb]oard ID\s+(\S+)", version).unwrap_or_default(),
            os_version: capture(r"^\s*NXOS:\s+version\s+(\S+)", version)
                .or_else(|| capture(r"^\s*system:\s+version\s+(\S+)", version))
                .unwrap_or_default(),
            stack_members: Vec::new(),
            interfaces: outputs
                .get(SHOW_IP_INTERFACE_VRF_ALL)
                .map(parse_vrf_interfaces)
                .unwrap_or_default(),
        })
    }
}

/// "mgmt0, Interface status: ..." followed by "IP address: x, IP subnet: y/len"
fn parse_vrf_interfaces(output: &str) -> Vec<InterfaceAddress> {
    let (Some(header), Some(address)) = (
        Regex::new(r"^(\S+), Interface status:").ok(),
        Regex::new(r"IP address: (\d+\.\d+\.\d+\.\d+), IP subnet: \S+/(\d+)").ok(),
    ) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut current: Option<String> = None;
    for line in output.lines() {
        if let Some(caps) = header.captures(line) {
            current = Some(caps[1].to_string());
            continue;
        }
        if let (Some(name), Some(caps)) = (current.as_ref(), address.captures(line)) {
            if let Some(addr) = interface_address(name, &caps[1], &caps[2]) {
                found.push(addr);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION: &str = "\
Cisco Nexus Operating System (NX-OS) Software
TAC support: http://www.cisco.com/tac

Software
  BIOS: version
  NXOS: version 9.3(8)
  NXOS image file is: bootflash:///nxos.9.3.8.bin

Hardware
  cisco Nexus9000 C9300v Chassis
  Intel(R) Xeon(R) CPU E5-2680 v2 @ 2.80GHz with 16409064 kB of memory.
  Processor Board ID 9N3KD63KWT0

  Device name: dc1-leaf01
  bootflash:    4287040 kB
";

    const INTERFACES: &str = "\
IP Interface Status for VRF \"management\"(2)
mgmt0, Interface status: protocol-up/link-up/admin-up, iod: 2,
  IP address: 192.0.2.10, IP subnet: 192.0.2.0/24 route-preference: 0, tag: 0
  IP broadcast address: 255.255.255.255

IP Interface Status for VRF \"default\"(1)
Ethernet1/1, Interface status: protocol-up/link-up/admin-up, iod: 5,
  IP address: 10.0.0.1, IP subnet: 10.0.0.0/31 route-preference: 0, tag: 0
";

    #[test]
    fn test_parse_show_version() {
        let mut outputs = CommandOutputs::default();
        outputs.insert(SHOW_VERSION, VERSION.to_string());
        outputs.insert(SHOW_IP_INTERFACE_VRF_ALL, INTERFACES.to_string());

        let facts = CiscoNxos.parse(&outputs).unwrap();
        assert_eq!(facts.hostname, "dc1-leaf01");
        assert_eq!(facts.model, "C9300v");
        assert_eq!(facts.serial, "9N3KD63KWT0");
        assert_eq!(facts.os_version, "9.3(8)");
        assert!(facts.stack_members.is_empty());
        assert_eq!(facts.interfaces.len(), 2);
        assert_eq!(facts.interfaces[0].name, "mgmt0");
        assert_eq!(facts.interfaces[0].prefix_length, 24);
        assert_eq!(facts.interfaces[1].prefix_length, 31);
    }

    #[test]
    fn test_old_release_version_line() {
        let mut outputs = CommandOutputs::default();
        outputs.insert(
            SHOW_VERSION,
            "Cisco Nexus Operating System (NX-OS) Software\n  system:    version 7.0(3)I7(4)\n  cisco Nexus 3048 Chassis\n  Device name: n3k\n"
                .to_string(),
        );
        let facts = CiscoNxos.parse(&outputs).unwrap();
        assert_eq!(facts.os_version, "7.0(3)I7(4)");
        assert_eq!(facts.model, "3048");
        assert!(facts.interfaces.is_empty());
    }
}
