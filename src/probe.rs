//! Ordered-probe resolution: first candidate that passes wins, else a fixed
//! default. Container names, IP addresses, and API URLs all resolve through
//! this one path so the fallback behavior stays uniform and testable.

use serde::Serialize;

/// Where a resolved value came from. Carried through diagnostics so a
/// best-effort guess is visible instead of silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    /// Set explicitly via environment variable; no probing performed.
    Explicit,
    /// First candidate that passed the probe.
    Probed,
    /// No candidate passed; fixed default returned.
    Fallback,
}

/// A resolved value together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub value: String,
    pub source: ResolutionSource,
}

impl Resolved {
    pub fn explicit(value: impl Into<String>) -> Self {
        Resolved {
            value: value.into(),
            source: ResolutionSource::Explicit,
        }
    }

    pub fn probed(value: impl Into<String>) -> Self {
        Resolved {
            value: value.into(),
            source: ResolutionSource::Probed,
        }
    }

    pub fn fallback(value: impl Into<String>) -> Self {
        Resolved {
            value: value.into(),
            source: ResolutionSource::Fallback,
        }
    }
}

/// Probe candidates in order and return the first for which `probe` succeeds,
/// else the default. Probe failures are indistinguishable from "not there":
/// this function never errors.
pub fn first_success<I, S, F>(candidates: I, mut probe: F, default: &str) -> Resolved
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(&str) -> bool,
{
    for candidate in candidates {
        let c = candidate.as_ref();
        if probe(c) {
            return Resolved::probed(c);
        }
    }
    Resolved::fallback(default)
}

/// Read a non-empty environment override, trimmed.
pub fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Explicit override wins outright (no probing); otherwise resolve.
pub fn resolve_with_override<F>(env_key: &str, resolve: F) -> Resolved
where
    F: FnOnce() -> Resolved,
{
    match env_override(env_key) {
        Some(v) => Resolved::explicit(v),
        None => resolve(),
    }
}
