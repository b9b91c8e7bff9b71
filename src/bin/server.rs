// 该文件是 Yixiang （医象） 项目的一部分。
// src/bin/server.rs - 分割 HTTP 服务
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use yixiang::{
  FromUrl,
  model::{Device, MedSamOnnxBuilder, Segmenter},
  server::{self, ServerConfig},
};

/// MedSAM 分割服务
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub server: ServerConfig,

  /// 模型目录，需包含 encoder.onnx 与 decoder.onnx
  #[arg(short, long, env = "MODEL", default_value = "medsam:work_dir/MedSAM", value_name = "MODEL")]
  pub model: Url,

  /// 推理设备: cpu 或 cuda:N，未给出时使用模型 URL 中的 device 参数，默认 cpu
  #[arg(long, env = "DEVICE")]
  pub device: Option<Device>,
}

#[actix_web::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  // 模型只加载一次，所有请求共享
  let backend = MedSamOnnxBuilder::from_url(&args.model)?
    .device_override(args.device)
    .build()?;

  server::serve(args.server, Segmenter::new(backend)).await
}
