// 该文件是 Yixiang （医象） 项目的一部分。
// src/server/error.rs - 服务错误与 HTTP 响应
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

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{prompt::BoxFormatError, server::storage::StoreError};

/// 返回给前端的错误，消息即响应体中的 `error` 字段
#[derive(Error, Debug)]
pub enum ServerError {
  #[error("{0}")]
  BadRequest(String),
  #[error("Invalid box format. Use 'x1,y1,x2,y2'")]
  InvalidBoxFormat(#[from] BoxFormatError),
  #[error("No image found with ID: {0}")]
  ImageNotFound(String),
  #[error("File too large. Maximum size is {0} bytes")]
  PayloadTooLarge(usize),
  #[error("Failed to encode mask image: {0}")]
  Encode(#[from] image::ImageError),
  #[error("{0}")]
  Internal(String),
}

impl From<StoreError> for ServerError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::NotFound(id) => ServerError::ImageNotFound(id),
      other => ServerError::Internal(other.to_string()),
    }
  }
}

impl ResponseError for ServerError {
  fn status_code(&self) -> StatusCode {
    match self {
      ServerError::BadRequest(_) | ServerError::InvalidBoxFormat(_) => StatusCode::BAD_REQUEST,
      ServerError::ImageNotFound(_) => StatusCode::NOT_FOUND,
      ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      ServerError::Encode(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      error!("请求处理失败: {}", self);
    } else {
      warn!("请求被拒绝 ({}): {}", status.as_u16(), self);
    }
    HttpResponse::build(status).json(json!({ "error": self.to_string() }))
  }
}
