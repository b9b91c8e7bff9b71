// 该文件是 Yixiang （医象） 项目的一部分。
// tests/server.rs - HTTP 接口测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

#![cfg(feature = "server")]

mod common;

use std::path::Path;

use actix_web::{
  App,
  http::{StatusCode, header},
  test, web,
};
use base64::Engine;
use serde_json::{Value, json};
use uuid::Uuid;
use yixiang::{
  model::Segmenter,
  server::{UploadStore, WELCOME_MESSAGE, configure},
};

use common::{BoxStub, black_png};

const BOUNDARY: &str = "yixiang-test-boundary";

fn multipart(
  field: &str,
  filename: &str,
  content_type: &str,
  data: &[u8],
) -> (String, Vec<u8>) {
  let mut body = Vec::new();
  body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
  body.extend_from_slice(
    format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
      .as_bytes(),
  );
  body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
  body.extend_from_slice(data);
  body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
  (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

fn upload_request(
  field: &str,
  filename: &str,
  content_type: &str,
  data: &[u8],
) -> test::TestRequest {
  let (ct, body) = multipart(field, filename, content_type, data);
  test::TestRequest::post()
    .uri("/upload")
    .insert_header((header::CONTENT_TYPE, ct))
    .set_payload(body)
}

fn state(dir: &Path, limit: usize) -> (web::Data<UploadStore>, web::Data<Segmenter<BoxStub>>) {
  let store = UploadStore::create(dir.join("uploads"), limit).unwrap();
  (web::Data::new(store), web::Data::new(Segmenter::new(BoxStub)))
}

macro_rules! service {
  ($dir:expr, $limit:expr) => {{
    let (store, segmenter) = state($dir, $limit);
    test::init_service(App::new().configure(move |cfg| configure(cfg, store, segmenter))).await
  }};
}

#[actix_web::test]
async fn home_returns_welcome_message() {
  let dir = tempfile::tempdir().unwrap();
  let app = service!(dir.path(), 1 << 20);

  let req = test::TestRequest::get().uri("/").to_request();
  let body = test::call_and_read_body(&app, req).await;
  assert_eq!(body, WELCOME_MESSAGE.as_bytes());
}

#[actix_web::test]
async fn upload_then_segment_returns_overlay() {
  let dir = tempfile::tempdir().unwrap();
  let app = service!(dir.path(), 1 << 20);

  let resp = test::call_service(
    &app,
    upload_request("file", "scan.png", "image/png", &black_png(512, 512)).to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  let id = body["path"].as_str().unwrap().to_string();
  assert!(Uuid::parse_str(&id).is_ok());
  assert!(dir.path().join("uploads").join(format!("{id}.png")).is_file());

  let req = test::TestRequest::post()
    .uri("/new-box")
    .set_json(json!({ "filePath": id, "boundingBox": "100,100,200,200" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;

  let png = base64::engine::general_purpose::STANDARD
    .decode(body["mask_image"].as_str().unwrap())
    .unwrap();
  let overlay = image::load_from_memory(&png).unwrap().to_rgba8();
  assert_eq!(overlay.dimensions(), (512, 512));
  assert_eq!(overlay.pixels().filter(|p| p[3] == 153).count(), 10_000);
  assert!(overlay.pixels().all(|p| p[3] == 153 || p.0 == [0, 0, 0, 0]));
}

#[actix_web::test]
async fn upload_rejects_bad_requests() {
  let dir = tempfile::tempdir().unwrap();
  let app = service!(dir.path(), 1 << 20);
  let png = black_png(8, 8);

  let cases = [
    (
      upload_request("image", "scan.png", "image/png", &png),
      "Please provide an 'file' file",
    ),
    (
      upload_request("file", "", "image/png", &png),
      "No file selected",
    ),
    (
      upload_request("file", "notes.txt", "text/plain", b"hello"),
      "Invalid file type.",
    ),
  ];

  for (req, message) in cases {
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], message);
  }
}

#[actix_web::test]
async fn upload_enforces_size_limit() {
  let dir = tempfile::tempdir().unwrap();
  let app = service!(dir.path(), 64);

  let resp = test::call_service(
    &app,
    upload_request("file", "big.jpg", "image/jpeg", &vec![0u8; 4096]).to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].as_str().unwrap().contains("64"));
}

#[actix_web::test]
async fn new_box_validates_input() {
  let dir = tempfile::tempdir().unwrap();
  let app = service!(dir.path(), 1 << 20);

  let resp = test::call_service(
    &app,
    upload_request("file", "scan.png", "image/png", &black_png(32, 32)).to_request(),
  )
  .await;
  let body: Value = test::read_body_json(resp).await;
  let id = body["path"].as_str().unwrap().to_string();

  let unknown = Uuid::new_v4().to_string();
  let cases = [
    (
      json!({ "filePath": id, "boundingBox": "1,2,3" }),
      StatusCode::BAD_REQUEST,
      "Invalid box format. Use 'x1,y1,x2,y2'".to_string(),
    ),
    (
      json!({ "filePath": unknown, "boundingBox": "1,2,3,4" }),
      StatusCode::NOT_FOUND,
      format!("No image found with ID: {unknown}"),
    ),
    (
      json!({ "filePath": "../uploads/secret", "boundingBox": "1,2,3,4" }),
      StatusCode::NOT_FOUND,
      "No image found with ID: ../uploads/secret".to_string(),
    ),
    (
      json!({ "boundingBox": "1,2,3,4" }),
      StatusCode::BAD_REQUEST,
      "Please provide both 'filePath' and 'boundingBox'".to_string(),
    ),
  ];

  for (payload, status, message) in cases {
    let req = test::TestRequest::post()
      .uri("/new-box")
      .set_json(payload)
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), status);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], message.as_str());
  }
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
  let dir = tempfile::tempdir().unwrap();
  let app = service!(dir.path(), 1 << 20);

  let req = test::TestRequest::post()
    .uri("/new-box")
    .insert_header((header::CONTENT_TYPE, "application/json"))
    .set_payload("{not json")
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].is_string());
}
