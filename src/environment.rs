#![allow(clippy::module_name_repetitions)]
//! Environment detection: which platform we are on (Umbrel, plain Docker,
//! local dev), which containers hold ord and bitcoind, where the ord HTTP
//! API lives, and which host IP to advertise to the container network.
//!
//! Explicit environment variables always win with no probing:
//! `ORD_RPC_HOST`, `BITCOIN_RPC_HOST`, `ORD_API_URL`, `ORDFORGE_LOCAL_IP`.
//! Resolution never fails; the fallback guess is marked as such in the
//! report so callers can see how much to trust it.

use std::net::Ipv4Addr;
use std::path::Path;

use serde::Serialize;

use crate::docker;
use crate::probe::{env_override, first_success, resolve_with_override, Resolved, ResolutionSource};

/// Ordered candidates for the ord container. Umbrel compose names first,
/// then the common standalone names.
pub const ORD_CONTAINER_CANDIDATES: &[&str] =
    &["ordinals_ord_1", "ordinals_server_1", "ord-server", "ord"];

/// Ordered candidates for the bitcoind container.
pub const BITCOIN_CONTAINER_CANDIDATES: &[&str] =
    &["bitcoin_bitcoind_1", "bitcoin-bitcoind", "bitcoind", "bitcoin"];

pub const DEFAULT_ORD_CONTAINER: &str = "ord";
pub const DEFAULT_BITCOIN_CONTAINER: &str = "bitcoind";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Umbrel,
    Docker,
    Local,
}

/// The resolved environment, serialized verbatim on `/api/environment`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub platform: Platform,
    pub ord_container: Resolved,
    pub bitcoin_container: Resolved,
    pub ord_api_url: Resolved,
    pub local_ip: Resolved,
}

/// Resolve using the real docker probe.
pub fn detect() -> Environment {
    detect_with(docker::container_is_running)
}

/// Resolve with an injected container probe. Explicit env overrides return
/// without calling the probe at all.
pub fn detect_with<F>(mut probe: F) -> Environment
where
    F: FnMut(&str) -> bool,
{
    let ord_container = resolve_with_override("ORD_RPC_HOST", || {
        first_success(
            ORD_CONTAINER_CANDIDATES.iter().copied(),
            &mut probe,
            DEFAULT_ORD_CONTAINER,
        )
    });
    let bitcoin_container = resolve_with_override("BITCOIN_RPC_HOST", || {
        first_success(
            BITCOIN_CONTAINER_CANDIDATES.iter().copied(),
            &mut probe,
            DEFAULT_BITCOIN_CONTAINER,
        )
    });

    let platform = detect_platform(&ord_container, &bitcoin_container);

    let ord_api_url = resolve_with_override("ORD_API_URL", || match platform {
        Platform::Local => Resolved::fallback("http://127.0.0.1:80"),
        _ => Resolved::fallback(format!("http://{}:80", ord_container.value)),
    });

    let local_ip = resolve_with_override("ORDFORGE_LOCAL_IP", resolve_local_ip);

    Environment {
        platform,
        ord_container,
        bitcoin_container,
        ord_api_url,
        local_ip,
    }
}

/// Umbrel when the env/filesystem says so or a compose-named container
/// answered the probe; Docker when anything container-shaped resolved;
/// Local otherwise.
fn detect_platform(ord: &Resolved, bitcoin: &Resolved) -> Platform {
    if env_override("UMBREL").is_some() {
        return Platform::Umbrel;
    }
    if let Some(root) = env_override("UMBREL_ROOT") {
        if Path::new(&root).exists() {
            return Platform::Umbrel;
        }
    }
    if Path::new("/home/umbrel/umbrel").exists() {
        return Platform::Umbrel;
    }
    let umbrel_named = |r: &Resolved| {
        r.source == ResolutionSource::Probed
            && (r.value.starts_with("ordinals_") || r.value.starts_with("bitcoin_"))
    };
    if umbrel_named(ord) || umbrel_named(bitcoin) {
        return Platform::Umbrel;
    }
    if ord.source != ResolutionSource::Fallback || bitcoin.source != ResolutionSource::Fallback {
        return Platform::Docker;
    }
    Platform::Local
}

/// Rank an interface/address pair for advertising into the container
/// network: docker bridges first, then 172.16/12, then 10/8, then the rest.
pub fn ip_rank(iface: &str, ip: Ipv4Addr) -> u8 {
    if iface == "docker0" || iface.starts_with("br-") {
        return 0;
    }
    let o = ip.octets();
    if o[0] == 172 && (16..=31).contains(&o[1]) {
        1
    } else if o[0] == 10 {
        2
    } else {
        3
    }
}

fn resolve_local_ip() -> Resolved {
    let mut candidates = interface_ipv4_addrs();
    candidates.sort_by_key(|(iface, ip)| ip_rank(iface, *ip));
    match candidates.first() {
        Some((_, ip)) => Resolved::probed(ip.to_string()),
        None => Resolved::fallback("localhost"),
    }
}

/// Non-loopback IPv4 addresses per interface, in enumeration order.
#[cfg(unix)]
pub fn interface_ipv4_addrs() -> Vec<(String, Ipv4Addr)> {
    let mut out = Vec::new();
    let Ok(addrs) = nix::ifaddrs::getifaddrs() else {
        return out;
    };
    for ifa in addrs {
        let Some(storage) = ifa.address else {
            continue;
        };
        let Some(sin) = storage.as_sockaddr_in() else {
            continue;
        };
        let ip = sin.ip();
        if !ip.is_loopback() {
            out.push((ifa.interface_name.clone(), ip));
        }
    }
    out
}

#[cfg(not(unix))]
pub fn interface_ipv4_addrs() -> Vec<(String, Ipv4Addr)> {
    Vec::new()
}
