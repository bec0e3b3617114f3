mod common;

use std::io::Cursor;

use common::{get, multipart_upload, post_multipart, spawn_server};
use image::ImageFormat;
use serde_json::Value;

fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    // Deterministic noise so the PNG stays comfortably above the
    // optimization threshold regardless of encoder tuning.
    let mut state: u32 = 0x2545_f491;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };
    let mut img = image::RgbaImage::new(width, height);
    for px in img.pixels_mut() {
        let r = next();
        *px = image::Rgba([r as u8, (r >> 8) as u8, (r >> 16) as u8, 255]);
    }
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

// Upload an above-threshold PNG with optimizeImage=true: either the server
// staged a strictly smaller .webp, or re-encoding did not shrink it and the
// original PNG is kept with imageOptimized=false. Never an error.
#[test]
fn test_upload_with_optimize_never_grows_and_reports_outcome() {
    let cache = tempfile::tempdir().unwrap();
    let server = spawn_server(cache.path(), &[]);
    let port = server.port;

    let png = png_fixture(512, 512);
    assert!(png.len() > 46 * 1024, "fixture must exceed the threshold");

    let body = multipart_upload(
        "OPTBOUND",
        "photo.png",
        "image/png",
        &png,
        &[("optimizeImage", "true")],
    );
    let (status, resp) = post_multipart(port, "/api/upload", "OPTBOUND", &body);
    assert!(status.contains("200"), "{status}");
    let v: Value = serde_json::from_slice(&resp).unwrap();
    assert_eq!(v["error"], false);

    let file_name = v["fileName"].as_str().unwrap();
    let size = v["size"].as_u64().unwrap();
    let staged = cache.path().join(file_name);
    assert!(staged.exists(), "staged file missing: {file_name}");
    assert_eq!(std::fs::metadata(&staged).unwrap().len(), size);

    if v["imageOptimized"] == true {
        assert!(file_name.ends_with(".webp"), "expected webp: {file_name}");
        assert!(
            size < png.len() as u64,
            "optimized file must be strictly smaller"
        );
        assert!(!cache.path().join("photo.png").exists());
    } else {
        assert!(file_name.ends_with(".png"), "expected png: {file_name}");
        assert_eq!(size, png.len() as u64);
    }

    // Re-uploading the optimized bytes must not grow them further
    let staged_bytes = std::fs::read(&staged).unwrap();
    let body2 = multipart_upload(
        "OPTBOUND",
        file_name,
        "application/octet-stream",
        &staged_bytes,
        &[("optimizeImage", "true")],
    );
    let (status2, resp2) = post_multipart(port, "/api/upload", "OPTBOUND", &body2);
    assert!(status2.contains("200"), "{status2}");
    let v2: Value = serde_json::from_slice(&resp2).unwrap();
    assert!(v2["size"].as_u64().unwrap() <= size);
}

// Uploads with a disallowed extension are rejected before touching the cache.
#[test]
fn test_upload_rejects_unlisted_extension() {
    let cache = tempfile::tempdir().unwrap();
    let server = spawn_server(cache.path(), &[]);
    let port = server.port;

    let body = multipart_upload("XB", "payload.exe", "application/x-dosexec", b"MZ", &[]);
    let (status, resp) = post_multipart(port, "/api/upload", "XB", &body);
    assert!(status.contains("400"), "{status}");
    let v: Value = serde_json::from_slice(&resp).unwrap();
    assert_eq!(v["error"], true);

    let (_, info) = get(port, "/api/cache/info");
    let usage: Value = serde_json::from_slice(&info).unwrap();
    assert_eq!(usage["files"], serde_json::json!([]));
}
