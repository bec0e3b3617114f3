mod common;

use common::{delete, get, multipart_upload, post_json, post_multipart, spawn_server};
use serde_json::Value;

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("response body is not JSON")
}

#[test]
fn test_api_surface_end_to_end() {
    let cache = tempfile::tempdir().unwrap();
    let server = spawn_server(cache.path(), &[("ORD_RPC_HOST", "mynode")]);
    let port = server.port;

    // environment: explicit override is returned verbatim, no probing
    let (status, body) = get(port, "/api/environment");
    assert!(status.contains("200"), "{status}");
    let env = body_json(&body);
    assert_eq!(env["ordContainer"]["value"], "mynode");
    assert_eq!(env["ordContainer"]["source"], "explicit");

    // umbrel diagnostics agree with the environment report
    let (status, body) = get(port, "/api/umbrel/status");
    assert!(status.contains("200"), "{status}");
    let umbrel = body_json(&body);
    assert_eq!(umbrel["ordContainer"]["value"], "mynode");

    // upload a text file, list it, fetch it, delete it
    let upload = multipart_upload("XBOUND", "note.txt", "text/plain", b"gm ordinals", &[]);
    let (status, body) = post_multipart(port, "/api/upload", "XBOUND", &upload);
    assert!(status.contains("200"), "{status}");
    let uploaded = body_json(&body);
    assert_eq!(uploaded["error"], false);
    assert_eq!(uploaded["imageOptimized"], false);
    let file_name = uploaded["fileName"].as_str().unwrap().to_string();
    assert!(file_name.ends_with(".txt"));

    let (status, body) = get(port, "/api/cache/info");
    assert!(status.contains("200"), "{status}");
    let info = body_json(&body);
    assert_eq!(info["files"][0]["name"], file_name.as_str());

    let (status, body) = get(port, &format!("/api/cache/file/{file_name}"));
    assert!(status.contains("200"), "{status}");
    assert_eq!(body, b"gm ordinals");

    // command generation references the cached file inside the container
    let (status, body) = post_json(
        port,
        "/api/inscribe/command",
        &format!(r#"{{"fileName":"{file_name}","feeRate":15}}"#),
    );
    assert!(status.contains("200"), "{status}");
    let cmd = body_json(&body);
    let command = cmd["command"].as_str().unwrap();
    assert!(
        command.starts_with("docker exec mynode ord wallet inscribe --fee-rate 15 --file /data/"),
        "command: {command}"
    );

    let (status, body) = delete(port, &format!("/api/cache/file/{file_name}"));
    assert!(status.contains("200"), "{status}");
    assert_eq!(body_json(&body)["removed"], true);

    // brc20 command generation writes the payload file and renders the command
    let (status, body) = post_json(
        port,
        "/api/brc20/command",
        r#"{"op":"mint","tick":"ordi","amount":1000,"feeRate":8}"#,
    );
    assert!(status.contains("200"), "{status}");
    let brc = body_json(&body);
    assert_eq!(brc["payload"]["op"], "mint");
    assert_eq!(brc["payload"]["amt"], "1000");
    assert!(brc["command"].as_str().unwrap().contains("docker exec mynode"));
    let payload_file = brc["fileName"].as_str().unwrap();
    assert!(cache.path().join(payload_file).exists());

    // invalid brc20 ticker is a validation error
    let (status, body) = post_json(
        port,
        "/api/brc20/command",
        r#"{"op":"mint","tick":"toolong","amount":1,"feeRate":8}"#,
    );
    assert!(status.contains("400"), "{status}");
    assert_eq!(body_json(&body)["error"], true);

    // sns and bitmap command generation
    let (status, body) = post_json(
        port,
        "/api/sns/command",
        r#"{"name":"Satoshi","feeRate":5}"#,
    );
    assert!(status.contains("200"), "{status}");
    assert_eq!(body_json(&body)["payload"]["name"], "satoshi.sats");

    let (status, body) = post_json(
        port,
        "/api/bitmap/command",
        r#"{"number":840000,"feeRate":5}"#,
    );
    assert!(status.contains("200"), "{status}");
    assert_eq!(body_json(&body)["payload"], "840000.bitmap");

    // status registry starts empty
    let (status, body) = get(port, "/api/inscriptions");
    assert!(status.contains("200"), "{status}");
    assert_eq!(body_json(&body), serde_json::json!([]));

    // execute refuses anything that is not a docker command
    let (status, body) = post_json(port, "/api/execute", r#"{"command":"rm -rf /"}"#);
    assert!(status.contains("400"), "{status}");
    assert_eq!(body_json(&body)["error"], true);

    // unknown routes are a JSON 404
    let (status, body) = get(port, "/api/nope");
    assert!(status.contains("404"), "{status}");
    assert_eq!(body_json(&body)["error"], true);

    // fileserver status starts stopped
    let (status, body) = get(port, "/api/fileserver/status");
    assert!(status.contains("200"), "{status}");
    assert_eq!(body_json(&body)["running"], false);
}
