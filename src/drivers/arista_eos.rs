use crate::onboarding::OnboardError;

use super::{capture, parse_internet_address_blocks, CommandOutputs, ParsedFacts, PlatformDriver, SHOW_VERSION};

const SHOW_HOSTNAME: &str = "show hostname";
const SHOW_IP_INTERFACE: &str = "show ip interface";

/// Arista EOS
pub struct AristaEos;

impl PlatformDriver for AristaEos {
    fn platform(&self) -> &'static str {
        "arista_eos"
    }

    fn enable_command(&self) -> Option<&'static str> {
        Some("enable")
    }

    fn vendor(&self) -> &'static str {
        "Arista"
    }

    fn detect(&self, version_output: &str) -> bool {
        version_output.contains("Arista")
    }

    fn commands(&self) -> &'static [&'static str] {
        &[SHOW_VERSION, SHOW_HOSTNAME, SHOW_IP_INTERFACE]
    }

    fn parse(&self, outputs: &CommandOutputs) -> Result<ParsedFacts, OnboardError> {
        let version = outputs.require(SHOW_VERSION)?;
        let hostname = outputs
            .get(SHOW_HOSTNAME)
            .and_then(|out| capture(r"^Hostname:\s*(\S+)", out))
            .ok_or_else(|| OnboardError::Execute("hostname missing from show hostname".to_string()))?;

        Ok(ParsedFacts {
            hostname,
            model: capture(r"^Arista (\S+)", version).unwrap_or_default(),
            serial: capture(r"^Serial number:\s*(\S+)", version).unwrap_or_default(),
            os_version: capture(r"^Software image version:\s*(\S+)", version).unwrap_or_default(),
            stack_members: Vec::new(),
            interfaces: outputs
                .get(SHOW_IP_INTERFACE)
                .map(parse_internet_address_blocks)
                .unwrap_or_default(),
        })
    }
}
