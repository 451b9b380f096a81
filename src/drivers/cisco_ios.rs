use regex_lite::Regex;

use crate::onboarding::OnboardError;

use super::{
    capture, parse_internet_address_blocks, CommandOutputs, ParsedFacts, PlatformDriver,
    StackMember, SHOW_VERSION,
};

const SHOW_IP_INTERFACE: &str = "show ip interface";

/// Cisco IOS and IOS XE, including Catalyst switch stacks
pub struct CiscoIos;

impl PlatformDriver for CiscoIos {
    fn platform(&self) -> &'static str {
        "cisco_ios"
    }

    fn enable_command(&self) -> Option<&'static str> {
        Some("enable")
    }

    fn vendor(&self) -> &'static str {
        "Cisco"
    }

    fn detect(&self, version_output: &str) -> bool {
        version_output.contains("Cisco IOS Software")
            || version_output.contains("Cisco IOS XE Software")
            || version_output.contains("Cisco Internetwork Operating System")
    }

    fn commands(&self) -> &'static [&'static str] {
        &[SHOW_VERSION, SHOW_IP_INTERFACE]
    }

    fn parse(&self, outputs: &CommandOutputs) -> Result<ParsedFacts, OnboardError> {
        let version = outputs.require(SHOW_VERSION)?;

        let hostname = capture(r"^(\S+) uptime is", version)
            .ok_or_else(|| OnboardError::Execute("hostname missing from show version".to_string()))?;
        let stack_members = parse_stack_members(version);

        let model = stack_members
            .first()
            .map(|m| m.model.clone())
            .or_else(|| capture(r"^[Cc]isco (\S+) \(.*\) processor", version))
            .unwrap_or_default();
        let serial = stack_members
            .first()
            .map(|m| m.serial.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| capture(r"^System [Ss]erial [Nn]umber\s*:\s*(\S+)", version))
            .or_else(|| capture(r"^Processor board ID (\S+)", version))
            .unwrap_or_default();

        Ok(ParsedFacts {
            hostname,
            model,
            serial,
            os_version: capture(r"Version ([^,\s]+)", version).unwrap_or_default(),
            stack_members,
            interfaces: outputs
                .get(SHOW_IP_INTERFACE)
                .map(parse_internet_address_blocks)
                .unwrap_or_default(),
        })
    }
}

/// Members listed in the "Switch Ports Model" table of `show version`.
/// Serials come from the top section for the first switch and from the
/// "Switch 0N" sections for the others. Virtual IOSv never reports a stack.
fn parse_stack_members(version: &str) -> Vec<StackMember> {
    if version.contains("IOSv") {
        return Vec::new();
    }
    let Some(row) = Regex::new(r"^\*?\s*(\d+)\s+(\d+)\s+(\S+)\s+\S+\s+\S+").ok() else {
        return Vec::new();
    };
    let Some(section) = Regex::new(r"^Switch 0*(\d+)\s*$").ok() else {
        return Vec::new();
    };
    let Some(serial) = Regex::new(r"^System [Ss]erial [Nn]umber\s*:\s*(\S+)").ok() else {
        return Vec::new();
    };

    let mut members: Vec<StackMember> = Vec::new();
    let mut in_table = false;
    for line in version.lines() {
        if line.trim_start().starts_with("Switch Ports Model") {
            in_table = true;
            continue;
        }
        if !in_table {
            continue;
        }
        if line.trim().is_empty() {
            break;
        }
        if let Some(caps) = row.captures(line) {
            if let Ok(index) = caps[1].parse::<u32>() {
                members.push(StackMember {
                    index,
                    model: caps[3].to_string(),
                    serial: String::new(),
                });
            }
        }
    }
    if members.is_empty() {
        return members;
    }

    let first_index = members.iter().map(|m| m.index).min().unwrap_or(1);
    let mut current = first_index;
    for line in version.lines() {
        if let Some(caps) = section.captures(line.trim_end()) {
            if let Ok(index) = caps[1].parse::<u32>() {
                current = index;
            }
            continue;
        }
        if let Some(caps) = serial.captures(line) {
            if let Some(member) = members.iter_mut().find(|m| m.index == current) {
                if member.serial.is_empty() {
                    member.serial = caps[1].to_string();
                }
            }
        }
    }

    members.sort_by_key(|m| m.index);
    members
}
