use std::net::{IpAddr, SocketAddr};

use crate::utils::is_valid_hostname;

use super::error::OnboardError;

/// Resolve an onboarding target (IP literal or DNS name) to one address.
/// IPv4 results are preferred when a name resolves to both families.
pub async fn resolve_target(target: &str, port: u16) -> Result<IpAddr, OnboardError> {
    let target = target.trim();
    if target.contains('/') {
        return Err(OnboardError::InvalidTarget(format!(
            "'{}' is a prefix, not a single address",
            target
        )));
    }
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }
    if !is_valid_hostname(target) {
        return Err(OnboardError::InvalidTarget(format!(
            "'{}' is neither an IP address nor a hostname",
            target
        )));
    }

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((target, port))
        .await
        .map_err(|e| {
            OnboardError::Connection(format!("failed to complete DNS lookup for {}: {}", target, e))
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(|a| a.ip())
        .ok_or_else(|| {
            OnboardError::Connection(format!("failed to complete DNS lookup for {}: no addresses", target))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ip_literal_is_used_as_is() {
        let ip = resolve_target("198.51.100.5", 22).await.unwrap();
        assert_eq!(ip, "198.51.100.5".parse::<IpAddr>().unwrap());

        let ip = resolve_target(" 2001:db8::1 ", 22).await.unwrap();
        assert_eq!(ip, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_prefix_is_rejected() {
        let err = resolve_target("198.51.100.0/24", 22).await.unwrap_err();
        assert_eq!(err.reason(), "fail-config");
    }

    #[tokio::test]
    async fn test_garbage_is_rejected_before_dns() {
        let err = resolve_target("host;rm -rf", 22).await.unwrap_err();
        assert!(matches!(err, OnboardError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_localhost_resolves() {
        let ip = resolve_target("localhost", 22).await.unwrap();
        assert!(ip.is_loopback());
    }
}
