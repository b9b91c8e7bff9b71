// 该文件是 Yixiang （医象） 项目的一部分。
// src/server/handlers.rs - 路由处理
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

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::TryStreamExt;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  model::{SegmentationModel, Segmenter},
  output::encode_png_base64,
  overlay::OverlayColor,
  prompt::BoundingBox,
  server::{error::ServerError, storage::UploadStore},
};

pub const WELCOME_MESSAGE: &str = "Welcome to the MedSAM Backend";

const UPLOAD_FIELD: &str = "file";
const ALLOWED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
  pub message: String,
  /// 图像标识，后续分割请求用它引用图像
  pub path: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NewBoxRequest {
  #[serde(rename = "filePath")]
  pub file_path: Option<String>,
  #[serde(rename = "boundingBox")]
  pub bounding_box: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewBoxResponse {
  /// base64 编码的 RGBA PNG 覆盖层
  pub mask_image: String,
}

pub async fn home() -> HttpResponse {
  HttpResponse::Ok().body(WELCOME_MESSAGE)
}

pub async fn upload(
  store: web::Data<UploadStore>,
  mut payload: Multipart,
) -> Result<HttpResponse, ServerError> {
  let limit = store.max_file_size();

  while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
    if field.name() != Some(UPLOAD_FIELD) {
      while field.try_next().await.map_err(bad_multipart)?.is_some() {}
      continue;
    }

    let filename = field
      .content_disposition()
      .and_then(|cd| cd.get_filename())
      .unwrap_or_default()
      .to_string();
    if filename.is_empty() {
      return Err(ServerError::BadRequest("No file selected".to_string()));
    }

    let mime = field
      .content_type()
      .map(|mime| mime.essence_str().to_string())
      .unwrap_or_default();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
      debug!("拒绝文件 {}，类型: {}", filename, mime);
      return Err(ServerError::BadRequest("Invalid file type.".to_string()));
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
      if bytes.len() + chunk.len() > limit {
        return Err(ServerError::PayloadTooLarge(limit));
      }
      bytes.extend_from_slice(&chunk);
    }

    let store = store.clone();
    let id = web::block(move || store.save(&bytes))
      .await
      .map_err(|e| ServerError::Internal(e.to_string()))??;
    info!("收到上传 {} -> {}", filename, id);

    return Ok(HttpResponse::Ok().json(UploadResponse {
      message: "File uploaded successfully.".to_string(),
      path: id.to_string(),
    }));
  }

  Err(ServerError::BadRequest(
    "Please provide an 'file' file".to_string(),
  ))
}

fn bad_multipart(err: actix_multipart::MultipartError) -> ServerError {
  ServerError::BadRequest(format!("Malformed multipart body: {}", err))
}

pub async fn new_box<B>(
  store: web::Data<UploadStore>,
  segmenter: web::Data<Segmenter<B>>,
  request: web::Json<NewBoxRequest>,
) -> Result<HttpResponse, ServerError>
where
  B: SegmentationModel + Send + Sync + 'static,
{
  let NewBoxRequest {
    file_path,
    bounding_box,
  } = request.into_inner();
  let (Some(id), Some(bbox)) = (file_path, bounding_box) else {
    return Err(ServerError::BadRequest(
      "Please provide both 'filePath' and 'boundingBox'".to_string(),
    ));
  };
  let bbox: BoundingBox = bbox.parse()?;
  debug!("分割请求: {} {}", id, bbox);

  let mask_image = web::block(move || -> Result<String, ServerError> {
    let image = store.load(&id)?;
    let segmentation = segmenter
      .segment(&image, &bbox)
      .map_err(|e| ServerError::Internal(e.to_string()))?;
    let overlay = segmentation.overlay(OverlayColor::random());
    Ok(encode_png_base64(&DynamicImage::ImageRgba8(overlay))?)
  })
  .await
  .map_err(|e| ServerError::Internal(e.to_string()))??;

  Ok(HttpResponse::Ok().json(NewBoxResponse { mask_image }))
}
