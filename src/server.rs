#![allow(clippy::module_name_repetitions)]
//! The HTTP API server: one thread per connection, strictly sequential
//! request handling, JSON bodies in and out.
//!
//! Failure shapes follow the front end's expectations: subprocess failures
//! serialize as `{"error": true, "output": <raw text>}`, validation
//! failures as `{"error": true, "message": <text>}`.

use std::io::{self, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::cache::{CacheDir, ALLOWED_EXTENSIONS};
use crate::docker;
use crate::environment::{self, Platform};
use crate::fees;
use crate::fileserver::FileServer;
use crate::geniidata;
use crate::inscribe::{self, Brc20Request, InscribeOptions};
use crate::lock::acquire_cache_lock;
use crate::probe::env_override;
use crate::stage;
use crate::status::StatusRegistry;
use crate::util::http::{
    multipart_boundary, parse_multipart, read_http_request, HttpRequest, Method,
};
use crate::util::{content_type_for_extension, file_extension, shell_like_split_args};

pub const DEFAULT_PORT: u16 = 4420;
pub const DEFAULT_FILESERVER_PORT: u16 = 8090;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
const INSCRIBE_TIMEOUT: Duration = Duration::from_secs(180);
const WALLET_TIMEOUT: Duration = Duration::from_secs(30);
const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(3);

pub struct AppState {
    pub cache: CacheDir,
    pub statuses: StatusRegistry,
    pub fileserver: Mutex<FileServer>,
    pub max_upload_bytes: usize,
}

struct Response {
    status: u16,
    content_type: String,
    body: Vec<u8>,
}

impl Response {
    fn json(status: u16, value: &Value) -> Self {
        Response {
            status,
            content_type: "application/json".to_string(),
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    fn message(status: u16, msg: &str) -> Self {
        Self::json(status, &json!({ "error": true, "message": msg }))
    }

    fn subprocess_failure(output: &str) -> Self {
        Self::json(502, &json!({ "error": true, "output": output }))
    }

    fn bytes(content_type: &str, body: Vec<u8>) -> Self {
        Response {
            status: 200,
            content_type: content_type.to_string(),
            body,
        }
    }
}

/// Bind and serve until the process exits. Holds the cache-dir lock for
/// the server's lifetime.
pub fn serve(port: u16, cache: CacheDir) -> io::Result<()> {
    cache.ensure()?;
    let _lock = acquire_cache_lock(cache.dir())?;

    let bind = env_override("ORDFORGE_BIND").unwrap_or_else(|| "0.0.0.0".to_string());
    let listener = TcpListener::bind((bind.as_str(), port))?;
    let local = listener.local_addr()?;
    // Stable startup line; tests and scripts read the bound port from here.
    println!("ordforge: serving on http://{local}");
    let _ = io::stdout().flush();
    info!(%local, cache_dir = %cache.dir().display(), "api server listening");

    let state = Arc::new(AppState {
        cache,
        statuses: StatusRegistry::new(),
        fileserver: Mutex::new(FileServer::new()),
        max_upload_bytes: env_override("ORDFORGE_MAX_UPLOAD_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
    });

    for stream in listener.incoming() {
        match stream {
            Ok(s) => {
                let st = Arc::clone(&state);
                std::thread::spawn(move || handle_connection(&st, s));
            }
            Err(e) => warn!(error = %e, "accept failed"),
        }
    }
    Ok(())
}

fn handle_connection(state: &AppState, mut stream: TcpStream) {
    let _ = stream.set_read_timeout(Some(CONNECTION_TIMEOUT));
    let _ = stream.set_write_timeout(Some(CONNECTION_TIMEOUT));

    let response = match read_http_request(&mut stream, state.max_upload_bytes) {
        Ok(req) => {
            let resp = route(state, &req);
            info!(
                method = ?req.method,
                path = %req.path,
                status = resp.status,
                "request"
            );
            resp
        }
        Err(e) => Response::message(400, &format!("bad request: {e}")),
    };

    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason_phrase(response.status),
        response.content_type,
        response.body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
    let _ = stream.shutdown(Shutdown::Both);
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "OK",
    }
}

fn body_json<T: serde::de::DeserializeOwned>(req: &HttpRequest) -> Result<T, Response> {
    serde_json::from_slice(&req.body)
        .map_err(|e| Response::message(400, &format!("invalid JSON body: {e}")))
}

fn route(state: &AppState, req: &HttpRequest) -> Response {
    let path = req.path.trim_matches('/').to_string();
    let segs: Vec<&str> = path.split('/').collect();

    match (&req.method, segs.as_slice()) {
        (Method::Get, ["api", "environment"]) => handle_environment(),
        (Method::Get, ["api", "container", "check"]) => handle_container_check(req),
        (Method::Get, ["api", "network", "diagnostics"]) => handle_network_diagnostics(),
        (Method::Get, ["api", "umbrel", "status"]) => handle_umbrel_status(),
        (Method::Get, ["api", "fees"]) => handle_fees(),

        (Method::Post, ["api", "upload"]) => handle_upload(state, req),
        (Method::Get, ["api", "cache", "info"]) => {
            Response::json(200, &serde_json::to_value(state.cache.usage()).unwrap_or_default())
        }
        (Method::Post, ["api", "cache", "clear"]) => {
            let removed = state.cache.clear();
            Response::json(200, &json!({ "error": false, "removed": removed }))
        }
        (Method::Get, ["api", "cache", "file", name]) => handle_cache_serve(state, name),
        (Method::Delete, ["api", "cache", "file", name]) => handle_cache_delete(state, name),

        (Method::Post, ["api", "inscribe", "command"]) => handle_inscribe_command(state, req),
        (Method::Post, ["api", "inscribe"]) => handle_inscribe(state, req),
        (Method::Post, ["api", "execute"]) => handle_execute(state, req),

        (Method::Post, ["api", "brc20", "command"]) => handle_brc20_command(state, req),
        (Method::Post, ["api", "sns", "command"]) => handle_sns_command(state, req),
        (Method::Post, ["api", "bitmap", "command"]) => handle_bitmap_command(state, req),
        (Method::Get, ["api", "brc20", "info"]) => match req.query_param("tick") {
            Some(tick) => Response::json(200, &geniidata::brc20_tick_info(tick)),
            None => Response::message(400, "missing tick parameter"),
        },
        (Method::Get, ["api", "sns", "check"]) => match req.query_param("name") {
            Some(name) => Response::json(200, &geniidata::sns_name_available(name)),
            None => Response::message(400, "missing name parameter"),
        },
        (Method::Get, ["api", "bitmap", "check"]) => match req
            .query_param("number")
            .and_then(|n| n.parse::<u64>().ok())
        {
            Some(number) => Response::json(200, &geniidata::bitmap_available(number)),
            None => Response::message(400, "missing or invalid number parameter"),
        },

        (Method::Get, ["api", "inscriptions"]) => Response::json(
            200,
            &serde_json::to_value(state.statuses.list()).unwrap_or_default(),
        ),
        (Method::Get, ["api", "inscriptions", id]) => match state.statuses.get(id) {
            Some(r) => Response::json(200, &serde_json::to_value(r).unwrap_or_default()),
            None => Response::message(404, &format!("no inscription record {id}")),
        },

        (Method::Get, ["api", "wallet", "balance"]) => handle_wallet(&["wallet", "balance"]),
        (Method::Get, ["api", "wallet", "receive"]) => handle_wallet(&["wallet", "receive"]),

        (Method::Post, ["api", "fileserver", "start"]) => handle_fileserver_start(state, req),
        (Method::Post, ["api", "fileserver", "stop"]) => {
            let mut fs = match state.fileserver.lock() {
                Ok(f) => f,
                Err(e) => e.into_inner(),
            };
            let stopped = fs.stop();
            Response::json(200, &json!({ "error": false, "stopped": stopped }))
        }
        (Method::Get, ["api", "fileserver", "status"]) => {
            let mut fs = match state.fileserver.lock() {
                Ok(f) => f,
                Err(e) => e.into_inner(),
            };
            let status = serde_json::to_value(fs.status()).unwrap_or_default();
            Response::json(200, &status)
        }

        (Method::Get, [""]) => Response::json(
            200,
            &json!({
                "name": "ordforge",
                "version": env!("CARGO_PKG_VERSION"),
            }),
        ),
        _ => Response::message(404, &format!("no route for {}", req.path)),
    }
}

fn handle_environment() -> Response {
    let env = environment::detect();
    Response::json(200, &serde_json::to_value(env).unwrap_or_default())
}

fn handle_container_check(req: &HttpRequest) -> Response {
    let Some(name) = req.query_param("name") else {
        return Response::message(400, "missing name parameter");
    };
    Response::json(
        200,
        &json!({
            "name": name,
            "running": docker::container_is_running(name),
            "runningContainers": docker::running_containers(),
        }),
    )
}

fn ord_api_reachable(url: &str) -> bool {
    let Ok(client) = reqwest::blocking::Client::builder()
        .timeout(REACHABILITY_TIMEOUT)
        .build()
    else {
        return false;
    };
    client.get(url).send().map(|r| r.status().is_success()).unwrap_or(false)
}

fn handle_network_diagnostics() -> Response {
    let env = environment::detect();
    let candidates: Vec<Value> = environment::interface_ipv4_addrs()
        .into_iter()
        .map(|(iface, ip)| {
            json!({
                "interface": iface,
                "ip": ip.to_string(),
                "rank": environment::ip_rank(&iface, ip),
            })
        })
        .collect();
    Response::json(
        200,
        &json!({
            "networks": docker::networks(),
            "ipCandidates": candidates,
            "ordApi": {
                "url": env.ord_api_url.value,
                "reachable": ord_api_reachable(&env.ord_api_url.value),
            },
            "bitcoinNode": fees::node_status(&env),
        }),
    )
}

fn handle_umbrel_status() -> Response {
    let env = environment::detect();
    Response::json(
        200,
        &json!({
            "umbrel": env.platform == Platform::Umbrel,
            "platform": env.platform,
            "ordContainer": env.ord_container,
            "bitcoinContainer": env.bitcoin_container,
        }),
    )
}

fn handle_fees() -> Response {
    let env = environment::detect();
    let (fees, source) = fees::recommended(&env);
    let mut v = serde_json::to_value(fees).unwrap_or_default();
    if let Some(obj) = v.as_object_mut() {
        obj.insert("source".to_string(), Value::String(source.to_string()));
    }
    Response::json(200, &v)
}

fn handle_upload(state: &AppState, req: &HttpRequest) -> Response {
    let Some(boundary) = req
        .header("content-type")
        .and_then(multipart_boundary)
    else {
        return Response::message(400, "expected multipart/form-data");
    };
    let parts = parse_multipart(&req.body, &boundary);

    let optimize = parts
        .iter()
        .find(|p| p.name == "optimizeImage")
        .map(|p| matches!(String::from_utf8_lossy(&p.data).trim(), "true" | "1"))
        .unwrap_or(false);

    let Some(file_part) = parts.iter().find(|p| p.name == "file" && p.file_name.is_some()) else {
        return Response::message(400, "missing file part");
    };
    let original_name = file_part.file_name.clone().unwrap_or_default();
    let Some(ext) = file_extension(&original_name) else {
        return Response::message(400, "file has no extension");
    };
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Response::message(400, &format!("file type .{ext} is not accepted"));
    }
    if file_part.data.is_empty() {
        return Response::message(400, "uploaded file is empty");
    }
    if file_part.data.len() > state.max_upload_bytes {
        return Response::message(413, "uploaded file exceeds the size limit");
    }

    let stored = match state.cache.store_unique(&original_name, &file_part.data) {
        Ok(p) => p,
        Err(e) => return Response::message(500, &format!("could not store upload: {e}")),
    };

    let outcome = if optimize {
        stage::optimize_image(&stored, stage::optimize_threshold())
    } else {
        let size = file_part.data.len() as u64;
        stage::OptimizeOutcome {
            path: stored.clone(),
            optimized: false,
            original_size: size,
            final_size: size,
        }
    };

    // Keep the cache inside its quota after every upload.
    let _ = state.cache.sweep();

    let file_name = outcome
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Response::json(
        200,
        &json!({
            "error": false,
            "fileName": file_name,
            "size": outcome.final_size,
            "imageOptimized": outcome.optimized,
        }),
    )
}

fn handle_cache_serve(state: &AppState, name: &str) -> Response {
    let Some(path) = state.cache.file_path(name) else {
        return Response::message(400, &format!("invalid cache file name: {name}"));
    };
    match std::fs::read(&path) {
        Ok(bytes) => {
            let ct = file_extension(name)
                .map(|e| content_type_for_extension(&e))
                .unwrap_or("application/octet-stream");
            Response::bytes(ct, bytes)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Response::message(404, &format!("not cached: {name}"))
        }
        Err(e) => Response::message(500, &e.to_string()),
    }
}

fn handle_cache_delete(state: &AppState, name: &str) -> Response {
    match state.cache.remove(name) {
        Ok(removed) => Response::json(200, &json!({ "error": false, "removed": removed })),
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
            Response::message(400, &e.to_string())
        }
        Err(e) => Response::message(500, &e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InscribeApiRequest {
    file_name: String,
    #[serde(flatten)]
    opts: InscribeOptions,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Resolve the cached file and optionally materialize the metadata sidecar.
/// Returns (local file, container file path, metadata paths).
fn prepare_inscription(
    state: &AppState,
    api: &InscribeApiRequest,
) -> Result<(std::path::PathBuf, String, Option<(std::path::PathBuf, String)>), Response> {
    if let Err(msg) = api.opts.validate() {
        return Err(Response::message(400, &msg));
    }
    let Some(local) = state.cache.file_path(&api.file_name) else {
        return Err(Response::message(400, &format!("invalid file name: {}", api.file_name)));
    };
    if !local.exists() {
        return Err(Response::message(404, &format!("not cached: {}", api.file_name)));
    }
    let data_dir = stage::container_data_dir();
    let container_file = format!("{}/{}", data_dir.trim_end_matches('/'), api.file_name);

    let metadata = match &api.metadata {
        Some(meta) => {
            let stem = api.file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(&api.file_name);
            let meta_name = format!("{stem}.metadata.json");
            let meta_path = match state.cache.store_unique(&meta_name, meta.to_string().as_bytes())
            {
                Ok(p) => p,
                Err(e) => {
                    return Err(Response::message(500, &format!("could not write metadata: {e}")))
                }
            };
            let meta_file = meta_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or(meta_name);
            let container_meta = format!("{}/{}", data_dir.trim_end_matches('/'), meta_file);
            Some((meta_path, container_meta))
        }
        None => None,
    };

    Ok((local, container_file, metadata))
}

fn handle_inscribe_command(state: &AppState, req: &HttpRequest) -> Response {
    let api: InscribeApiRequest = match body_json(req) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let (_local, container_file, metadata) = match prepare_inscription(state, &api) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let env = environment::detect();
    let argv = inscribe::inscribe_argv(
        &env.ord_container.value,
        &container_file,
        &api.opts,
        metadata.as_ref().map(|(_, c)| c.as_str()),
    );
    Response::json(
        200,
        &json!({
            "error": false,
            "command": inscribe::render_command(&argv),
            "containerPath": container_file,
            "metadataFile": metadata.map(|(p, _)| p.file_name().map(|n| n.to_string_lossy().to_string())),
            "ordContainer": env.ord_container,
        }),
    )
}

fn run_argv(argv: &[String], timeout: Duration) -> Result<crate::util::ExecOutput, String> {
    let (program, rest) = argv.split_first().ok_or("empty command")?;
    crate::util::ExecService::new(timeout)
        .run(
            crate::util::ExecRequest::new(program)
                .args(rest.iter().map(String::as_str)),
        )
        .map_err(|e| e.to_string())
}

fn handle_inscribe(state: &AppState, req: &HttpRequest) -> Response {
    let api: InscribeApiRequest = match body_json(req) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let (local, container_file, metadata) = match prepare_inscription(state, &api) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let env = environment::detect();
    let alternatives = stage::alternative_containers(&env.ord_container.value);
    let data_dir = stage::container_data_dir();

    let staged = match stage::stage_file(
        &env.ord_container.value,
        &alternatives,
        &local,
        &data_dir,
        true,
    ) {
        Ok(s) => s,
        Err(e) => return Response::subprocess_failure(&e.to_string()),
    };
    if let Some((meta_path, _)) = &metadata {
        if let Err(e) =
            stage::stage_file(&staged.container, &alternatives, meta_path, &data_dir, false)
        {
            return Response::subprocess_failure(&e.to_string());
        }
    }

    let argv = inscribe::inscribe_argv(
        &staged.container,
        &container_file,
        &api.opts,
        metadata.as_ref().map(|(_, c)| c.as_str()),
    );
    let command = inscribe::render_command(&argv);

    let file_type = file_extension(&api.file_name)
        .map(|e| content_type_for_extension(&e).to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let record_id = state.statuses.begin(&api.file_name, &file_type);

    let out = match run_argv(&argv, INSCRIBE_TIMEOUT) {
        Ok(o) => o,
        Err(e) => {
            state.statuses.fail(&record_id, &e);
            return Response::subprocess_failure(&e);
        }
    };
    if !out.success() {
        let combined = out.combined();
        state.statuses.fail(&record_id, &combined);
        return Response::subprocess_failure(&combined);
    }

    let parsed = inscribe::parse_inscribe_output(&out.stdout);
    state
        .statuses
        .complete(&record_id, &parsed.txid, &parsed.inscription_id, parsed.fee_paid);
    Response::json(
        200,
        &json!({
            "error": false,
            "id": record_id,
            "command": command,
            "container": staged.container,
            "verified": staged.verified,
            "txid": parsed.txid,
            "inscriptionId": parsed.inscription_id,
            "feePaid": parsed.fee_paid,
            "rawOutput": out.stdout,
        }),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest {
    command: String,
}

fn handle_execute(state: &AppState, req: &HttpRequest) -> Response {
    let body: ExecuteRequest = match body_json(req) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let argv = shell_like_split_args(&body.command);
    if argv.first().map(String::as_str) != Some("docker") {
        return Response::message(400, "only docker commands are accepted");
    }
    let file_name = argv
        .iter()
        .position(|a| a == "--file")
        .and_then(|i| argv.get(i + 1))
        .and_then(|p| p.rsplit('/').next())
        .unwrap_or("command")
        .to_string();
    let record_id = state.statuses.begin(&file_name, "command");

    let out = match run_argv(&argv, INSCRIBE_TIMEOUT) {
        Ok(o) => o,
        Err(e) => {
            state.statuses.fail(&record_id, &e);
            return Response::subprocess_failure(&e);
        }
    };
    if !out.success() {
        let combined = out.combined();
        state.statuses.fail(&record_id, &combined);
        return Response::subprocess_failure(&combined);
    }
    let parsed = inscribe::parse_inscribe_output(&out.stdout);
    state
        .statuses
        .complete(&record_id, &parsed.txid, &parsed.inscription_id, parsed.fee_paid);
    Response::json(
        200,
        &json!({
            "error": false,
            "id": record_id,
            "txid": parsed.txid,
            "inscriptionId": parsed.inscription_id,
            "feePaid": parsed.fee_paid,
            "rawOutput": out.stdout,
        }),
    )
}

/// Write a generated payload into the cache and render its inscribe command.
fn payload_command_response(
    state: &AppState,
    file_name: &str,
    payload_text: &str,
    fee_rate: f64,
    destination: Option<String>,
    payload_json: Value,
) -> Response {
    let stored = match state.cache.store_unique(file_name, payload_text.as_bytes()) {
        Ok(p) => p,
        Err(e) => return Response::message(500, &format!("could not write payload: {e}")),
    };
    let stored_name = stored
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    let env = environment::detect();
    let data_dir = stage::container_data_dir();
    let container_file = format!("{}/{stored_name}", data_dir.trim_end_matches('/'));
    let opts = InscribeOptions {
        fee_rate,
        destination,
        ..InscribeOptions::default()
    };
    let argv = inscribe::inscribe_argv(&env.ord_container.value, &container_file, &opts, None);
    Response::json(
        200,
        &json!({
            "error": false,
            "fileName": stored_name,
            "payload": payload_json,
            "command": inscribe::render_command(&argv),
            "ordContainer": env.ord_container,
        }),
    )
}

fn handle_brc20_command(state: &AppState, req: &HttpRequest) -> Response {
    let body: Brc20Request = match body_json(req) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let payload = match inscribe::brc20_payload(&body) {
        Ok(p) => p,
        Err(msg) => return Response::message(400, &msg),
    };
    let file_name = format!("brc20-{}-{}.txt", body.op.as_str(), body.tick);
    let text = payload.to_string();
    payload_command_response(state, &file_name, &text, body.fee_rate, body.destination.clone(), payload)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnsCommandRequest {
    name: String,
    fee_rate: f64,
    #[serde(default)]
    destination: Option<String>,
}

fn handle_sns_command(state: &AppState, req: &HttpRequest) -> Response {
    let body: SnsCommandRequest = match body_json(req) {
        Ok(v) => v,
        Err(r) => return r,
    };
    if let Err(msg) = inscribe::validate_fee_rate(body.fee_rate) {
        return Response::message(400, &msg);
    }
    let (payload, full_name) = match inscribe::sns_payload(&body.name) {
        Ok(v) => v,
        Err(msg) => return Response::message(400, &msg),
    };
    let file_name = format!("sns-{}.txt", full_name.replace('.', "-"));
    let text = payload.to_string();
    payload_command_response(state, &file_name, &text, body.fee_rate, body.destination.clone(), payload)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitmapCommandRequest {
    number: u64,
    fee_rate: f64,
    #[serde(default)]
    destination: Option<String>,
}

fn handle_bitmap_command(state: &AppState, req: &HttpRequest) -> Response {
    let body: BitmapCommandRequest = match body_json(req) {
        Ok(v) => v,
        Err(r) => return r,
    };
    if let Err(msg) = inscribe::validate_fee_rate(body.fee_rate) {
        return Response::message(400, &msg);
    }
    let text = inscribe::bitmap_payload(body.number);
    let file_name = format!("bitmap-{}.txt", body.number);
    payload_command_response(
        state,
        &file_name,
        &text,
        body.fee_rate,
        body.destination.clone(),
        Value::String(text.clone()),
    )
}

fn handle_wallet(args: &[&str]) -> Response {
    let env = environment::detect();
    let argv: Vec<String> = std::iter::once("ord".to_string())
        .chain(args.iter().map(|s| s.to_string()))
        .collect();
    match docker::exec_in_container(&env.ord_container.value, &argv, WALLET_TIMEOUT) {
        Ok(out) if out.success() => {
            let parsed: Value = serde_json::from_str(out.stdout.trim())
                .unwrap_or(Value::String(out.stdout.trim().to_string()));
            Response::json(200, &json!({ "error": false, "result": parsed }))
        }
        Ok(out) => Response::subprocess_failure(&out.combined()),
        Err(e) => Response::subprocess_failure(&e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileServerStartRequest {
    #[serde(default)]
    port: Option<u16>,
}

fn handle_fileserver_start(state: &AppState, req: &HttpRequest) -> Response {
    let body: FileServerStartRequest = if req.body.is_empty() {
        FileServerStartRequest { port: None }
    } else {
        match body_json(req) {
            Ok(v) => v,
            Err(r) => return r,
        }
    };
    let port = body.port.unwrap_or(DEFAULT_FILESERVER_PORT);
    let mut fs = match state.fileserver.lock() {
        Ok(f) => f,
        Err(e) => e.into_inner(),
    };
    match fs.start(state.cache.dir(), port) {
        Ok(status) => Response::json(
            200,
            &json!({
                "error": false,
                "fileserver": serde_json::to_value(status).unwrap_or_default(),
                "advertisedIp": environment::detect().local_ip,
            }),
        ),
        Err(e) => Response::message(409, &e.to_string()),
    }
}
