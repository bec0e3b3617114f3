//! Thin Geniidata indexer client for BRC-20/SNS/bitmap lookups.
//!
//! An unreachable upstream is not an error: every lookup degrades to an
//! `available: null` answer so the UI can render "unknown".

use std::time::Duration;

use serde_json::{json, Value};

use crate::probe::env_override;

const DEFAULT_BASE: &str = "https://api.geniidata.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(8);

fn base_url() -> String {
    env_override("GENIIDATA_API_URL").unwrap_or_else(|| DEFAULT_BASE.to_string())
}

fn get_json(path: &str) -> Option<Value> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .ok()?;
    let mut req = client
        .get(format!("{}{path}", base_url().trim_end_matches('/')))
        .header("accept", "application/json");
    if let Some(key) = env_override("GENIIDATA_API_KEY") {
        req = req.header("api-key", key);
    }
    let resp = req.send().ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.json::<Value>().ok()
}

fn unavailable(extra: Value) -> Value {
    let mut v = json!({
        "available": Value::Null,
        "source": "unavailable",
    });
    if let (Some(obj), Some(e)) = (v.as_object_mut(), extra.as_object()) {
        for (k, val) in e {
            obj.insert(k.clone(), val.clone());
        }
    }
    v
}

/// Deploy state of a BRC-20 ticker. `found == null` means the indexer was
/// unreachable, not that the ticker is free.
pub fn brc20_tick_info(tick: &str) -> Value {
    let path = format!("/api/1/brc20/tick/{}", urlencoding::encode(tick));
    match get_json(&path) {
        Some(v) => {
            let data = v.get("data").cloned().unwrap_or(Value::Null);
            json!({
                "tick": tick,
                "found": !data.is_null(),
                "data": data,
                "source": "geniidata",
            })
        }
        None => unavailable(json!({ "tick": tick, "found": Value::Null })),
    }
}

/// SNS names are first-inscription-wins; a found record means taken.
pub fn sns_name_available(name: &str) -> Value {
    let path = format!("/api/1/sns/name/{}", urlencoding::encode(name));
    match get_json(&path) {
        Some(v) => {
            let data = v.get("data").cloned().unwrap_or(Value::Null);
            json!({
                "name": name,
                "available": data.is_null(),
                "source": "geniidata",
            })
        }
        None => unavailable(json!({ "name": name })),
    }
}

pub fn bitmap_available(number: u64) -> Value {
    let path = format!("/api/1/bitmap/{number}");
    match get_json(&path) {
        Some(v) => {
            let data = v.get("data").cloned().unwrap_or(Value::Null);
            json!({
                "number": number,
                "available": data.is_null(),
                "source": "geniidata",
            })
        }
        None => unavailable(json!({ "number": number })),
    }
}
