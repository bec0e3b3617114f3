//! Fee-rate estimation with a three-step fallback chain: mempool.space,
//! then the local node's `estimatesmartfee`, then static defaults. Each
//! source is tried once per request; no backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::environment::Environment;
use crate::probe::env_override;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimates {
    pub fastest_fee: u64,
    pub half_hour_fee: u64,
    pub hour_fee: u64,
    pub economy_fee: u64,
    pub minimum_fee: u64,
}

/// Used when both live sources are unreachable.
pub const STATIC_DEFAULTS: FeeEstimates = FeeEstimates {
    fastest_fee: 25,
    half_hour_fee: 15,
    hour_fee: 8,
    economy_fee: 5,
    minimum_fee: 2,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

pub fn recommended(env: &Environment) -> (FeeEstimates, &'static str) {
    if let Some(fees) = from_mempool_space() {
        return (fees, "mempool.space");
    }
    if let Some(fees) = from_node_rpc(env) {
        return (fees, "bitcoind");
    }
    (STATIC_DEFAULTS, "static")
}

fn http_client() -> Option<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .ok()
}

/// mempool.space already answers in the shape we serve.
fn from_mempool_space() -> Option<FeeEstimates> {
    let base =
        env_override("MEMPOOL_API_URL").unwrap_or_else(|| "https://mempool.space".to_string());
    let url = url::Url::parse(&base)
        .ok()?
        .join("/api/v1/fees/recommended")
        .ok()?;
    let resp = http_client()?.get(url).send().ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.json::<FeeEstimates>().ok()
}

/// JSON-RPC against the resolved bitcoind. The container name doubles as
/// the RPC hostname (container DNS inside the compose network); on a dev
/// host this only works when the RPC port is published, and failure simply
/// falls through to the static defaults.
pub fn rpc_call(env: &Environment, method: &str, params: Value) -> Option<Value> {
    let user = env_override("BITCOIN_RPC_USER")?;
    let pass = env_override("BITCOIN_RPC_PASS")?;
    let port = env_override("BITCOIN_RPC_PORT")
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8332);
    let url = format!("http://{}:{port}/", env.bitcoin_container.value);
    let body = json!({
        "jsonrpc": "1.0",
        "id": "ordforge",
        "method": method,
        "params": params,
    });
    let resp = http_client()?
        .post(url)
        .basic_auth(user, Some(pass))
        .json(&body)
        .send()
        .ok()?;
    let v: Value = resp.json().ok()?;
    if !v["error"].is_null() {
        return None;
    }
    Some(v["result"].clone())
}

/// BTC/kvB from `estimatesmartfee` to sat/vB, floored at 1.
fn btc_per_kvb_to_sat_per_vb(v: f64) -> u64 {
    ((v * 100_000.0).round() as u64).max(1)
}

fn estimate_target(env: &Environment, blocks: u64) -> Option<u64> {
    let result = rpc_call(env, "estimatesmartfee", json!([blocks]))?;
    let rate = result.get("feerate")?.as_f64()?;
    Some(btc_per_kvb_to_sat_per_vb(rate))
}

fn from_node_rpc(env: &Environment) -> Option<FeeEstimates> {
    let fastest = estimate_target(env, 2)?;
    let half_hour = estimate_target(env, 3).unwrap_or(fastest);
    let hour = estimate_target(env, 6).unwrap_or(half_hour);
    let economy = estimate_target(env, 144).unwrap_or(hour);
    Some(FeeEstimates {
        fastest_fee: fastest,
        half_hour_fee: half_hour,
        hour_fee: hour,
        economy_fee: economy,
        minimum_fee: (economy / 2).max(1),
    })
}

/// `getblockchaininfo` for the diagnostics surface; None when unreachable.
pub fn node_status(env: &Environment) -> Option<Value> {
    rpc_call(env, "getblockchaininfo", json!([]))
}
