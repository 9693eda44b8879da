//! Host to IPv4 resolution.

use std::io;
use std::net::Ipv4Addr;

use thiserror::Error;
use tokio::net::lookup_host;

#[derive(Error, Debug)]
pub enum ResolveError {
  #[error("DNS failed to resolve {host}.")]
  Unresolvable { host: String },

  #[error("DNS lookup for {host} failed")]
  Lookup {
    host: String,
    #[source]
    source: io::Error,
  },
}

/// Resolve `host` to a single IPv4 address.
///
/// IPv4 literals are returned as-is. Anything else goes through the system
/// resolver and the first IPv4 answer wins; IPv6-only names are an error.
pub async fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, ResolveError> {
  let host = host.trim();
  if let Ok(ip) = host.parse::<Ipv4Addr>() {
    return Ok(ip);
  }

  let addresses =
    lookup_host((host, 0))
      .await
      .map_err(|source| ResolveError::Lookup {
        host: host.to_owned(),
        source,
      })?;

  let resolved = addresses
    .filter_map(|address| match address.ip() {
      std::net::IpAddr::V4(ip) => Some(ip),
      std::net::IpAddr::V6(_) => None,
    })
    .next();

  match resolved {
    Some(ip) => {
      tracing::debug!(%host, %ip, "resolved host");
      Ok(ip)
    }
    None => Err(ResolveError::Unresolvable {
      host: host.to_owned(),
    }),
  }
}
