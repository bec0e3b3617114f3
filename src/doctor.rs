//! `ordforge doctor`: environment and configuration diagnostics.

use std::process::Command;
use std::time::Duration;

use crate::color::{color_enabled_stderr, paint};
use crate::environment::{
    self, BITCOIN_CONTAINER_CANDIDATES, ORD_CONTAINER_CANDIDATES,
};
use crate::probe::ResolutionSource;
use crate::{cache::CacheDir, docker, fees};

fn source_label(source: ResolutionSource) -> &'static str {
    match source {
        ResolutionSource::Explicit => "explicit",
        ResolutionSource::Probed => "probed",
        ResolutionSource::Fallback => "fallback guess",
    }
}

pub fn run_doctor(verbose: bool) {
    let use_color = color_enabled_stderr();
    let val = |s: &str| paint(use_color, "\x1b[34;1m", s);

    eprintln!("ordforge doctor");
    eprintln!();
    eprintln!("  version: v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "  build:   {} ({}, {})",
        env!("ORDFORGE_BUILD_DATE"),
        env!("ORDFORGE_BUILD_TARGET"),
        env!("ORDFORGE_BUILD_PROFILE")
    );
    eprintln!(
        "  host:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    eprintln!();

    // Docker runtime
    match docker::runtime_path() {
        Ok(p) => {
            eprintln!("  docker: {}", val(&p.display().to_string()));
            if let Ok(out) = Command::new(&p).arg("--version").output() {
                let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if !s.is_empty() {
                    eprintln!("  docker --version: {s}");
                }
            }
        }
        Err(e) => {
            eprintln!("  docker: not found ({e})");
        }
    }
    eprintln!();

    // Resolved environment
    let env = environment::detect();
    eprintln!("  platform: {}", val(&format!("{:?}", env.platform).to_lowercase()));
    eprintln!(
        "  ord container: {} ({})",
        val(&env.ord_container.value),
        source_label(env.ord_container.source)
    );
    eprintln!(
        "  bitcoin container: {} ({})",
        val(&env.bitcoin_container.value),
        source_label(env.bitcoin_container.source)
    );
    eprintln!(
        "  ord API: {} ({})",
        val(&env.ord_api_url.value),
        source_label(env.ord_api_url.source)
    );
    eprintln!(
        "  advertised IP: {} ({})",
        val(&env.local_ip.value),
        source_label(env.local_ip.source)
    );

    if verbose {
        eprintln!();
        eprintln!("  container candidates:");
        for c in ORD_CONTAINER_CANDIDATES
            .iter()
            .chain(BITCOIN_CONTAINER_CANDIDATES.iter())
        {
            let running = docker::container_is_running(c);
            eprintln!(
                "    {c}: {}",
                if running { "running" } else { "not running" }
            );
        }
        let running = docker::running_containers();
        if !running.is_empty() {
            eprintln!("  running containers: {}", running.join(", "));
        }
    }
    eprintln!();

    // ord inside the container
    match docker::exec_in_container(
        &env.ord_container.value,
        &["ord".to_string(), "--version".to_string()],
        Duration::from_secs(10),
    ) {
        Ok(out) if out.success() => {
            eprintln!("  ord: {}", out.stdout.trim());
        }
        Ok(out) => {
            eprintln!("  ord: not reachable in container ({})", out.combined().trim());
        }
        Err(e) => {
            eprintln!("  ord: not reachable ({e})");
        }
    }

    // Cache
    let cache = CacheDir::from_env();
    let usage = cache.usage();
    eprintln!(
        "  cache: {} ({} files, {} / {} bytes)",
        usage.directory,
        usage.files.len(),
        usage.total_bytes,
        usage.limit_bytes
    );

    // Bitcoin node, when RPC credentials are configured
    match fees::node_status(&env) {
        Some(chain) => eprintln!(
            "  bitcoin node: chain {} at height {}",
            chain.get("chain").and_then(|v| v.as_str()).unwrap_or("?"),
            chain.get("blocks").and_then(|v| v.as_u64()).unwrap_or(0)
        ),
        None => eprintln!("  bitcoin node: RPC not reachable (set BITCOIN_RPC_USER/PASS)"),
    }

    // Fees
    let (estimates, source) = fees::recommended(&env);
    eprintln!(
        "  fee estimate: {} sat/vB fastest via {}",
        estimates.fastest_fee, source
    );

    eprintln!();
    eprintln!("doctor: completed diagnostics.");
}
