// 该文件是 Yixiang （医象） 项目的一部分。
// src/server.rs - HTTP 分割服务
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

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use tracing::info;

use crate::model::{SegmentationModel, Segmenter};

mod config;
mod error;
mod handlers;
mod storage;

pub use self::config::{DEFAULT_MAX_FILE_SIZE, ServerConfig};
pub use self::error::ServerError;
pub use self::handlers::{NewBoxRequest, NewBoxResponse, UploadResponse, WELCOME_MESSAGE};
pub use self::storage::{StoreError, UploadStore};

/// 注册路由与共享状态，测试中可直接用于 `App::configure`
pub fn configure<B>(
  cfg: &mut web::ServiceConfig,
  store: web::Data<UploadStore>,
  segmenter: web::Data<Segmenter<B>>,
) where
  B: SegmentationModel + Send + Sync + 'static,
{
  let json = web::JsonConfig::default()
    .error_handler(|err, _req| ServerError::BadRequest(err.to_string()).into());

  cfg
    .app_data(store)
    .app_data(segmenter)
    .app_data(json)
    .route("/", web::get().to(handlers::home))
    .route("/upload", web::post().to(handlers::upload))
    .route("/new-box", web::post().to(handlers::new_box::<B>));
}

/// `*` 表示允许任意来源，其余按单个来源处理
pub fn cors_for(origin: &str) -> Cors {
  let cors = Cors::default().allow_any_method().allow_any_header();
  if origin.trim() == "*" {
    cors.allow_any_origin()
  } else {
    cors.allowed_origin(origin)
  }
}

/// 启动服务，直到收到停止信号
pub async fn serve<B>(config: ServerConfig, segmenter: Segmenter<B>) -> anyhow::Result<()>
where
  B: SegmentationModel + Send + Sync + 'static,
{
  let store = web::Data::new(UploadStore::create(
    &config.upload_dir,
    config.max_file_size,
  )?);
  let segmenter = web::Data::new(segmenter);
  let origin = config.cors_origin.clone();

  let mut server = HttpServer::new(move || {
    let cors = cors_for(&origin);
    let store = store.clone();
    let segmenter = segmenter.clone();

    App::new()
      .wrap(cors)
      .wrap(Logger::default())
      .configure(move |cfg| configure(cfg, store, segmenter))
  });
  if let Some(workers) = config.workers {
    server = server.workers(workers);
  }

  info!(
    "服务监听于 {}:{}，上传目录: {}，允许来源: {}",
    config.bind,
    config.port,
    config.upload_dir.display(),
    config.cors_origin
  );
  server.bind((config.bind.as_str(), config.port))?.run().await?;
  info!("服务已停止");

  Ok(())
}
