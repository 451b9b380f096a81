use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use thiserror::Error;

/// Keyboard-interactive prompt handler that always responds with the password
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

#[derive(Debug, Error)]
pub enum SshError {
    /// TCP connect, handshake, or channel failure
    #[error("{0}")]
    Connect(String),
    #[error("{0}")]
    Auth(String),
}

/// Validate a hostname.
/// Allows alphanumeric, hyphens, dots, and underscores. No path separators or shell metacharacters.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Build a slug: lowercase alphanumerics and underscores, every other run
/// of characters collapsed into a single '-'.
/// e.g., "WS-C3850-24T / Rev A" -> "ws-c3850-24t-rev-a"
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Create an SSH session and authenticate with password + keyboard-interactive.
/// Returns the authenticated Session. Uses the ssh2 crate (libssh2).
/// This is blocking, so call from a spawn_blocking context.
pub fn ssh_connect(
    addr: SocketAddr,
    user: &str,
    pass: &str,
    timeout: Duration,
) -> Result<ssh2::Session, SshError> {
    let tcp = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| SshError::Connect(format!("TCP connection to {} failed: {}", addr, e)))?;

    tcp.set_read_timeout(Some(timeout)).ok();
    tcp.set_write_timeout(Some(timeout)).ok();

    let mut session = ssh2::Session::new()
        .map_err(|e| SshError::Connect(format!("Failed to create SSH session: {}", e)))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
    session
        .handshake()
        .map_err(|e| SshError::Connect(format!("SSH handshake failed: {}", e)))?;

    // Try password auth first
    match session.userauth_password(user, pass) {
        Ok(_) if session.authenticated() => return Ok(session),
        _ => {}
    }

    // Try keyboard-interactive auth (needed for Arista EOS and similar)
    let mut prompter = PasswordPrompt { password: pass.to_string() };
    let _ = session.userauth_keyboard_interactive(user, &mut prompter);

    if session.authenticated() {
        Ok(session)
    } else {
        Err(SshError::Auth("SSH authentication failed: all methods exhausted".to_string()))
    }
}

/// Execute one command on an existing SSH session and return its output.
/// This is blocking, so call from a spawn_blocking context.
pub fn ssh_exec(session: &ssh2::Session, command: &str) -> Result<String, SshError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| SshError::Connect(format!("Failed to open channel: {}", e)))?;

    channel
        .exec(command)
        .map_err(|e| SshError::Connect(format!("Failed to execute '{}': {}", command, e)))?;

    let mut output = String::new();
    channel
        .read_to_string(&mut output)
        .map_err(|e| SshError::Connect(format!("Failed to read output of '{}': {}", command, e)))?;

    let _ = channel.wait_close();
    Ok(output)
}

/// Feed `lines` to an interactive shell (with a pty) and return the whole
/// transcript, echoes and prompts included. The last line should make the
/// device close the channel (e.g. "exit").
/// This is blocking, so call from a spawn_blocking context.
pub fn ssh_shell_exec(session: &ssh2::Session, lines: &[&str]) -> Result<String, SshError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| SshError::Connect(format!("Failed to open channel: {}", e)))?;
    channel
        .request_pty("vt100", None, None)
        .map_err(|e| SshError::Connect(format!("Failed to request pty: {}", e)))?;
    channel
        .shell()
        .map_err(|e| SshError::Connect(format!("Failed to start shell: {}", e)))?;

    for line in lines {
        channel
            .write_all(format!("{}\n", line).as_bytes())
            .map_err(|e| SshError::Connect(format!("Failed to write to shell: {}", e)))?;
    }
    let _ = channel.send_eof();

    let mut output = String::new();
    channel
        .read_to_string(&mut output)
        .map_err(|e| SshError::Connect(format!("Failed to read shell output: {}", e)))?;

    let _ = channel.wait_close();
    Ok(output)
}

/// Cut the output of `command` out of an interactive transcript: the lines
/// after its echo, up to the next prompt.
pub fn transcript_output(transcript: &str, command: &str) -> String {
    let lines: Vec<&str> = transcript.lines().map(|l| l.trim_end_matches('\r')).collect();
    let Some(echo_at) = lines.iter().rposition(|l| l.trim_end().ends_with(command)) else {
        return String::new();
    };
    let echo = lines[echo_at].trim_end();
    let prompt = echo[..echo.len() - command.len()].trim_end();

    let mut out = Vec::new();
    for line in &lines[echo_at + 1..] {
        if !prompt.is_empty() && line.starts_with(prompt) {
            break;
        }
        out.push(*line);
    }
    out.join("\n")
}

/// True when CLI output is an error banner rather than command output
pub fn is_cli_error(output: &str) -> bool {
    let trimmed = output.trim_start();
    trimmed.starts_with('%')
        || trimmed.contains("Invalid input")
        || trimmed.contains("unknown command")
        || trimmed.starts_with("error:")
        || trimmed.starts_with("syntax error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_hostname() {
        assert!(is_valid_hostname("switch-01"));
        assert!(is_valid_hostname("router.lab.local"));
        assert!(is_valid_hostname("my_host"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("host name")); // spaces
        assert!(!is_valid_hostname("host;rm")); // semicolon
        assert!(!is_valid_hostname("../etc/passwd")); // path traversal
        assert!(!is_valid_hostname("host\nname")); // newline
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("C9300"), "c9300");
        assert_eq!(slugify("WS-C3850-24T / Rev A"), "ws-c3850-24t-rev-a");
        assert_eq!(slugify("  Cisco Systems, Inc. "), "cisco-systems-inc");
        assert_eq!(slugify("cisco_ios"), "cisco_ios");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_transcript_output() {
        let transcript = "sw1>enable\r\nPassword: \r\nsw1#terminal length 0\r\nsw1#show inventory\r\nNAME: \"1\", DESCR: \"WS-C3750G\"\r\nPID: WS-C3750G-48PS\r\nsw1#exit\r\n";
        assert_eq!(
            transcript_output(transcript, "show inventory"),
            "NAME: \"1\", DESCR: \"WS-C3750G\"\nPID: WS-C3750G-48PS"
        );
        assert_eq!(transcript_output(transcript, "show clock"), "");
    }

    #[test]
    fn test_is_cli_error() {
        assert!(is_cli_error("% Invalid input detected at '^' marker."));
        assert!(is_cli_error("\n% Unknown command"));
        assert!(is_cli_error("error: syntax error, expecting <command>"));
        assert!(!is_cli_error("Cisco IOS Software, C3750E Software"));
    }
}
