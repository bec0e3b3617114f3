#![allow(clippy::module_name_repetitions)]
//! Inscription command assembly and `ord` output parsing.
//!
//! Everything here is pure: validation, payload construction, argv/string
//! rendering, and the stdout parser. Execution happens in the caller via
//! the docker wrappers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::util::shell_join;

pub const MAX_FEE_RATE: f64 = 10_000.0;
pub const UNKNOWN: &str = "unknown";

static TICK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\x21-\x7e]{4}$").unwrap());
static SNS_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,63}$").unwrap());
static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(bc1|tb1|bcrt1)[a-z0-9]{20,90}$|^[13][a-km-zA-HJ-NP-Z1-9]{25,34}$").unwrap());
static INSCRIPTION_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([0-9a-f]{64}i[0-9]+)\b").unwrap());
static REVEAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)reveal\D*?([0-9a-f]{64})").unwrap());
static COMMIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)commit\D*?([0-9a-f]{64})").unwrap());
static ANY_TXID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([0-9a-f]{64})\b").unwrap());
static FEES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:total[_ ]?fees?|fees? paid)\D*?([0-9]+)").unwrap());

pub fn validate_fee_rate(fee_rate: f64) -> Result<(), String> {
    if !fee_rate.is_finite() || fee_rate <= 0.0 {
        return Err("fee rate must be a positive number of sat/vB".to_string());
    }
    if fee_rate > MAX_FEE_RATE {
        return Err(format!("fee rate above {MAX_FEE_RATE} sat/vB refused"));
    }
    Ok(())
}

pub fn validate_destination(address: &str) -> Result<(), String> {
    if ADDRESS_RE.is_match(address) {
        Ok(())
    } else {
        Err(format!("destination does not look like a Bitcoin address: {address}"))
    }
}

pub fn validate_parent(id: &str) -> Result<(), String> {
    if INSCRIPTION_ID_RE.is_match(id) {
        Ok(())
    } else {
        Err(format!("parent is not an inscription id: {id}"))
    }
}

/// Options common to every inscribe flow, deserialized straight from the
/// API body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InscribeOptions {
    pub fee_rate: f64,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub sat: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

impl InscribeOptions {
    pub fn validate(&self) -> Result<(), String> {
        validate_fee_rate(self.fee_rate)?;
        if let Some(dest) = &self.destination {
            validate_destination(dest)?;
        }
        if let Some(parent) = &self.parent {
            validate_parent(parent)?;
        }
        if let Some(sat) = &self.sat {
            if sat.trim().is_empty() {
                return Err("sat selector must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Render `docker exec <ord> ord wallet inscribe ...` as an argv.
pub fn inscribe_argv(
    ord_container: &str,
    container_file: &str,
    opts: &InscribeOptions,
    metadata_container_path: Option<&str>,
) -> Vec<String> {
    let mut argv: Vec<String> = vec![
        "docker".into(),
        "exec".into(),
        ord_container.into(),
        "ord".into(),
        "wallet".into(),
        "inscribe".into(),
        "--fee-rate".into(),
        format_amount(opts.fee_rate),
        "--file".into(),
        container_file.into(),
    ];
    if let Some(dest) = &opts.destination {
        argv.push("--destination".into());
        argv.push(dest.clone());
    }
    if let Some(meta) = metadata_container_path {
        argv.push("--metadata".into());
        argv.push(meta.to_string());
    }
    if let Some(parent) = &opts.parent {
        argv.push("--parent".into());
        argv.push(parent.clone());
    }
    if let Some(sat) = &opts.sat {
        argv.push("--sat".into());
        argv.push(sat.clone());
    }
    if let Some(ct) = &opts.content_type {
        argv.push("--content-type".into());
        argv.push(ct.clone());
    }
    if opts.dry_run {
        argv.push("--dry-run".into());
    }
    argv
}

/// The copyable command string shown to the user.
pub fn render_command(argv: &[String]) -> String {
    shell_join(argv)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brc20Op {
    Deploy,
    Mint,
    Transfer,
}

impl Brc20Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Brc20Op::Deploy => "deploy",
            Brc20Op::Mint => "mint",
            Brc20Op::Transfer => "transfer",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brc20Request {
    pub op: Brc20Op,
    pub tick: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub limit: Option<f64>,
    pub fee_rate: f64,
    #[serde(default)]
    pub destination: Option<String>,
}

fn validate_brc20_amount(v: f64, what: &str) -> Result<(), String> {
    if !v.is_finite() || v <= 0.0 || v > 1e18 {
        return Err(format!("{what} must be a positive number up to 1e18"));
    }
    Ok(())
}

/// Decimal rendering without a trailing `.0` for whole amounts; BRC-20
/// payload fields are strings.
pub fn format_amount(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e18 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/// Build the inline BRC-20 JSON payload for the requested operation.
pub fn brc20_payload(req: &Brc20Request) -> Result<Value, String> {
    if !TICK_RE.is_match(&req.tick) {
        return Err(format!(
            "ticker must be exactly 4 printable ASCII characters: {:?}",
            req.tick
        ));
    }
    validate_fee_rate(req.fee_rate)?;
    if let Some(dest) = &req.destination {
        validate_destination(dest)?;
    }
    match req.op {
        Brc20Op::Deploy => {
            let max = req.max.ok_or("deploy requires a max supply")?;
            validate_brc20_amount(max, "max supply")?;
            let mut payload = json!({
                "p": "brc-20",
                "op": "deploy",
                "tick": req.tick,
                "max": format_amount(max),
            });
            if let Some(limit) = req.limit {
                validate_brc20_amount(limit, "mint limit")?;
                if limit > max {
                    return Err("mint limit cannot exceed max supply".to_string());
                }
                payload["lim"] = Value::String(format_amount(limit));
            }
            Ok(payload)
        }
        Brc20Op::Mint | Brc20Op::Transfer => {
            let amt = req.amount.ok_or("mint/transfer requires an amount")?;
            validate_brc20_amount(amt, "amount")?;
            Ok(json!({
                "p": "brc-20",
                "op": req.op.as_str(),
                "tick": req.tick,
                "amt": format_amount(amt),
            }))
        }
    }
}

/// Normalize an SNS name (the `.sats` suffix is optional on input) and
/// build the registration payload.
pub fn sns_payload(name: &str) -> Result<(Value, String), String> {
    let lower = name.trim().to_ascii_lowercase();
    let bare = lower.strip_suffix(".sats").unwrap_or(&lower);
    if !SNS_NAME_RE.is_match(bare) {
        return Err(format!(
            "SNS name must be lowercase letters, digits or hyphens (max 64): {name:?}"
        ));
    }
    let full = format!("{bare}.sats");
    let payload = json!({
        "p": "sns",
        "op": "reg",
        "name": full,
    });
    Ok((payload, full))
}

/// Bitmap inscriptions are the literal text `<number>.bitmap`.
pub fn bitmap_payload(number: u64) -> String {
    format!("{number}.bitmap")
}

/// What we could extract from `ord wallet inscribe` stdout. Fields that
/// could not be recovered carry the literal `"unknown"` rather than
/// failing the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInscribeOutput {
    pub txid: String,
    pub inscription_id: String,
    pub fee_paid: Option<u64>,
}

/// Parser contract: try JSON first (modern `ord` prints a JSON object),
/// then the fixed regex set over raw text, then `"unknown"`.
pub fn parse_inscribe_output(stdout: &str) -> ParsedInscribeOutput {
    if let Some(parsed) = parse_json_output(stdout) {
        return parsed;
    }

    let inscription_id = INSCRIPTION_ID_RE
        .captures(stdout)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let txid = REVEAL_RE
        .captures(stdout)
        .or_else(|| COMMIT_RE.captures(stdout))
        .map(|c| c[1].to_string())
        .or_else(|| {
            // Any bare txid that is not the prefix of the inscription id
            ANY_TXID_RE
                .captures_iter(stdout)
                .map(|c| c[1].to_string())
                .find(|t| !inscription_id.starts_with(t.as_str()))
        })
        .unwrap_or_else(|| UNKNOWN.to_string());

    let fee_paid = FEES_RE
        .captures(stdout)
        .and_then(|c| c[1].parse::<u64>().ok());

    ParsedInscribeOutput {
        txid,
        inscription_id,
        fee_paid,
    }
}

fn parse_json_output(stdout: &str) -> Option<ParsedInscribeOutput> {
    let start = stdout.find('{')?;
    let end = stdout.rfind('}')?;
    if end <= start {
        return None;
    }
    let v: Value = serde_json::from_str(&stdout[start..=end]).ok()?;
    let txid = v
        .get("reveal")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN.to_string());
    let inscription_id = v
        .get("inscriptions")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(|i| i.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN.to_string());
    let fee_paid = v.get("total_fees").and_then(Value::as_u64);
    Some(ParsedInscribeOutput {
        txid,
        inscription_id,
        fee_paid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inscribe_argv_full_flags() {
        let opts = InscribeOptions {
            fee_rate: 12.0,
            destination: Some("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq".to_string()),
            parent: None,
            sat: Some("5000000000".to_string()),
            content_type: Some("image/webp".to_string()),
            dry_run: true,
        };
        let argv = inscribe_argv("ordinals_ord_1", "/data/pic.webp", &opts, Some("/data/pic.metadata.json"));
        let cmd = render_command(&argv);
        assert!(cmd.starts_with("docker exec ordinals_ord_1 ord wallet inscribe --fee-rate 12 --file /data/pic.webp"));
        assert!(cmd.contains("--destination bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
        assert!(cmd.contains("--metadata /data/pic.metadata.json"));
        assert!(cmd.contains("--sat 5000000000"));
        assert!(cmd.contains("--content-type image/webp"));
        assert!(cmd.ends_with("--dry-run"));
    }

    #[test]
    fn test_fee_rate_bounds() {
        assert!(validate_fee_rate(1.0).is_ok());
        assert!(validate_fee_rate(0.0).is_err());
        assert!(validate_fee_rate(-3.0).is_err());
        assert!(validate_fee_rate(f64::NAN).is_err());
        assert!(validate_fee_rate(10_001.0).is_err());
    }

    #[test]
    fn test_brc20_deploy_payload() {
        let req = Brc20Request {
            op: Brc20Op::Deploy,
            tick: "ordi".to_string(),
            amount: None,
            max: Some(21_000_000.0),
            limit: Some(1000.0),
            fee_rate: 10.0,
            destination: None,
        };
        let payload = brc20_payload(&req).unwrap();
        assert_eq!(payload["p"], "brc-20");
        assert_eq!(payload["op"], "deploy");
        assert_eq!(payload["max"], "21000000");
        assert_eq!(payload["lim"], "1000");
    }

    #[test]
    fn test_brc20_rejects_bad_tickers_and_amounts() {
        let mut req = Brc20Request {
            op: Brc20Op::Mint,
            tick: "toolong".to_string(),
            amount: Some(10.0),
            max: None,
            limit: None,
            fee_rate: 10.0,
            destination: None,
        };
        assert!(brc20_payload(&req).is_err());
        req.tick = "ok掉".to_string();
        assert!(brc20_payload(&req).is_err());
        req.tick = "ordi".to_string();
        req.amount = Some(-1.0);
        assert!(brc20_payload(&req).is_err());
        req.amount = None;
        assert!(brc20_payload(&req).is_err());
    }

    #[test]
    fn test_brc20_limit_cannot_exceed_max() {
        let req = Brc20Request {
            op: Brc20Op::Deploy,
            tick: "ordi".to_string(),
            amount: None,
            max: Some(100.0),
            limit: Some(1000.0),
            fee_rate: 10.0,
            destination: None,
        };
        assert!(brc20_payload(&req).is_err());
    }

    #[test]
    fn test_sns_payload_normalizes_suffix() {
        let (payload, full) = sns_payload("Satoshi").unwrap();
        assert_eq!(full, "satoshi.sats");
        assert_eq!(payload["name"], "satoshi.sats");
        let (_, full2) = sns_payload("already.sats").unwrap();
        assert_eq!(full2, "already.sats");
        assert!(sns_payload("bad name").is_err());
        assert!(sns_payload("-leading").is_err());
    }

    #[test]
    fn test_bitmap_payload() {
        assert_eq!(bitmap_payload(840000), "840000.bitmap");
    }

    const JSON_OUTPUT: &str = r#"{
  "commit": "5c1b0d1a64b6d2cd9d1b78b0ff24f12f4a3de4f24c0d8b4f4ed62cf5bb1e3a55",
  "inscriptions": [
    {
      "id": "a7a31b4c6e3f0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293i0",
      "location": "a7a31b4c6e3f0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293:0:0"
    }
  ],
  "parent": null,
  "reveal": "a7a31b4c6e3f0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293",
  "total_fees": 24681
}"#;

    #[test]
    fn test_parse_json_output() {
        let parsed = parse_inscribe_output(JSON_OUTPUT);
        assert_eq!(
            parsed.txid,
            "a7a31b4c6e3f0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293"
        );
        assert_eq!(
            parsed.inscription_id,
            "a7a31b4c6e3f0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293i0"
        );
        assert_eq!(parsed.fee_paid, Some(24681));
    }

    const LEGACY_OUTPUT: &str = "\
commit\t5c1b0d1a64b6d2cd9d1b78b0ff24f12f4a3de4f24c0d8b4f4ed62cf5bb1e3a55
reveal\tb2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a7a31b4c6e3f0a1
inscription\tb2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a7a31b4c6e3f0a1i0
fees paid: 13000 sats
";

    #[test]
    fn test_parse_legacy_text_output() {
        let parsed = parse_inscribe_output(LEGACY_OUTPUT);
        assert_eq!(
            parsed.txid,
            "b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a7a31b4c6e3f0a1"
        );
        assert_eq!(
            parsed.inscription_id,
            "b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a7a31b4c6e3f0a1i0"
        );
        assert_eq!(parsed.fee_paid, Some(13000));
    }

    #[test]
    fn test_parse_unrecognized_output_yields_unknown() {
        let parsed = parse_inscribe_output("error: wallet is locked\n");
        assert_eq!(parsed.txid, UNKNOWN);
        assert_eq!(parsed.inscription_id, UNKNOWN);
        assert_eq!(parsed.fee_paid, None);
    }
}
