use crate::onboarding::OnboardError;

use super::{capture, parse_internet_address_blocks, CommandOutputs, ParsedFacts, PlatformDriver, SHOW_VERSION};

const SHOW_INVENTORY: &str = "show inventory";
const SHOW_IPV4_INTERFACE: &str = "show ipv4 interface";

/// Cisco IOS XR
pub struct CiscoXr;

impl PlatformDriver for CiscoXr {
    fn platform(&self) -> &'static str {
        "cisco_xr"
    }

    fn vendor(&self) -> &'static str {
        "Cisco"
    }

    fn detect(&self, version_output: &str) -> bool {
        version_output.contains("Cisco IOS XR Software")
    }

    fn commands(&self) -> &'static [&'static str] {
        &[SHOW_VERSION, SHOW_INVENTORY, SHOW_IPV4_INTERFACE]
    }

    fn parse(&self, outputs: &CommandOutputs) -> Result<ParsedFacts, OnboardError> {
        let version = outputs.require(SHOW_VERSION)?;
        let hostname = capture(r"^(\S+) uptime is", version)
            .ok_or_else(|| OnboardError::Execute("hostname missing from show version".to_string()))?;

        // The first inventory entry is the chassis
        let inventory = outputs.get(SHOW_INVENTORY).unwrap_or_default();
        let model = capture(r"PID:\s*([^,\s]+)", inventory)
            .or_else(|| capture(r"^cisco (.+?)(?: Series)? \(.*\) processor", version))
            .unwrap_or_default();

        Ok(ParsedFacts {
            hostname,
            model,
            serial: capture(r"SN:\s*(\S+)", inventory).unwrap_or_default(),
            os_version: capture(r"Cisco IOS XR Software, Version ([^\[\s]+)", version).unwrap_or_default(),
            stack_members: Vec::new(),
            interfaces: outputs
                .get(SHOW_IPV4_INTERFACE)
                .map(parse_internet_address_blocks)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION: &str = "\
Cisco IOS XR Software, Version 6.1.3[Default]
Copyright (c) 2017 by Cisco Systems, Inc.

ROM: System Bootstrap, Version 2.04(20140424:063844) [ASR9K ROMMON],

core-r1 uptime is 3 weeks, 2 days, 1 hour, 12 minutes
System image file is \"disk0:asr9k-os-mbi-6.1.3/0x100305/mbiasr9k-rsp3.vm\"

cisco ASR9K Series (Intel 686 F6M14S4) processor with 6291456K bytes of memory.
";

    #[test]
    fn test_parse_with_inventory() {
        let mut outputs = CommandOutputs::default();
        outputs.insert(SHOW_VERSION, VERSION.to_string());
        outputs.insert(
            SHOW_INVENTORY,
            "NAME: \"Rack 0\", DESCR: \"ASR-9006 AC Chassis\"
PID: ASR-9006-AC, VID: V01, SN: FOX1234ABCD

NAME: \"0/RSP0/CPU0\", DESCR: \"ASR9K Route Switch Processor\"
PID: A9K-RSP440-SE, VID: V05, SN: FOC9999ZZZZ
"
            .to_string(),
        );
        outputs.insert(
            SHOW_IPV4_INTERFACE,
            "MgmtEth0/RSP0/CPU0/0 is Up, Line protocol is Up
  Vrf is default (vrfid 0x60000000)
  Internet address is 192.0.2.40/24
"
            .to_string(),
        );

        let facts = CiscoXr.parse(&outputs).unwrap();
        assert_eq!(facts.hostname, "core-r1");
        assert_eq!(facts.model, "ASR-9006-AC");
        assert_eq!(facts.serial, "FOX1234ABCD");
        assert_eq!(facts.os_version, "6.1.3");
        assert_eq!(facts.interfaces[0].name, "MgmtEth0/RSP0/CPU0/0");
    }

    #[test]
    fn test_model_falls_back_to_version() {
        let mut outputs = CommandOutputs::default();
        outputs.insert(SHOW_VERSION, VERSION.to_string());
        let facts = CiscoXr.parse(&outputs).unwrap();
        assert_eq!(facts.model, "ASR9K");
        assert!(facts.serial.is_empty());
    }
}
