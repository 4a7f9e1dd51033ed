use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Reasons a peer or server address is rejected during normalization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
	#[error("address is empty")]
	Empty,

	#[error("invalid host in address {0:?}")]
	InvalidHost(String),

	#[error("invalid port in address {0:?}")]
	InvalidPort(String),
}

/// Normalize `address` to a `host:port` string, appending `default_port` when the address
/// carries no port of its own.
///
/// IPv6 literals are returned in bracketed form (`[::1]:9108`).
pub fn normalize_address(address: &str, default_port: u16) -> Result<String, AddressError> {
	let address = address.trim();
	if address.is_empty() {
		return Err(AddressError::Empty);
	}

	if let Ok(socket) = address.parse::<SocketAddr>() {
		return Ok(socket.to_string());
	}
	if let Ok(ip) = address.parse::<IpAddr>() {
		return Ok(SocketAddr::new(ip, default_port).to_string());
	}

	// Bracketed IPv6 without a port, e.g. "[::1]".
	if let Some(inner) = address.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
		return inner
			.parse::<Ipv6Addr>()
			.map(|ip| SocketAddr::new(IpAddr::V6(ip), default_port).to_string())
			.map_err(|_| AddressError::InvalidHost(address.to_string()));
	}

	match address.rsplit_once(':') {
		Some((host, port)) => {
			if !is_valid_hostname(host) {
				return Err(AddressError::InvalidHost(address.to_string()));
			}
			let port: u16 = port
				.parse()
				.map_err(|_| AddressError::InvalidPort(address.to_string()))?;
			Ok(format!("{}:{}", host, port))
		}
		None => {
			if !is_valid_hostname(address) {
				return Err(AddressError::InvalidHost(address.to_string()));
			}
			Ok(format!("{}:{}", address, default_port))
		}
	}
}

fn is_valid_hostname(host: &str) -> bool {
	if host.is_empty() || host.len() > 253 {
		return false;
	}
	host.split('.').all(|label| {
		!label.is_empty()
			&& label.len() <= 63
			&& !label.starts_with('-')
			&& !label.ends_with('-')
			&& label
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
	})
}
