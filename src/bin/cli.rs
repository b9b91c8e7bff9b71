// 该文件是 Yixiang （医象） 项目的一部分。
// src/bin/cli.rs - 单张图像分割命令行
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use yixiang::{
  FromUrl,
  input::ImageFileInput,
  model::{Device, MedSamOnnxBuilder, SegmentRequest, Segmenter},
  output::{OutputWrapper, PreviewOutput, SaveImageFileOutput},
  prompt::BoundingBox,
  task::{OneShotTask, Task},
};

/// 用边界框提示分割一张医学图像，输出 0/255 灰度掩码
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像路径
  #[arg(short = 'i', long, default_value = "assets/img_demo.png", value_name = "FILE")]
  pub data_path: PathBuf,

  /// 掩码输出目录，文件名为 seg_<输入文件名>.png，如 seg_img_demo.png.png
  #[arg(short = 'o', long, default_value = "assets/", value_name = "DIR")]
  pub seg_path: PathBuf,

  /// 原图坐标下的边界框 x1,y1,x2,y2
  #[arg(long = "box", default_value = "[95, 255, 190, 350]", value_name = "BOX")]
  pub bbox: BoundingBox,

  /// 推理设备: cpu 或 cuda:N，未给出时使用模型 URL 中的 device 参数，默认 cpu
  #[arg(long)]
  pub device: Option<Device>,

  /// 模型目录，需包含 encoder.onnx 与 decoder.onnx
  #[arg(
    short = 'm',
    long,
    visible_alias = "checkpoint",
    default_value = "medsam:work_dir/MedSAM",
    value_name = "MODEL"
  )]
  pub model: Url,

  /// 额外保存一张叠加了掩码与边界框的预览图
  #[arg(long, value_name = "FILE")]
  pub preview: Option<PathBuf>,

  /// 附加输出，可重复，如 image:out/mask.png 或 preview:out/preview.png
  #[arg(long = "output", value_name = "OUTPUT")]
  pub outputs: Vec<Url>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入图像: {}", args.data_path.display());
  info!("输出目录: {}", args.seg_path.display());
  info!("边界框: {}", args.bbox);
  info!("模型: {}", args.model);

  let input = ImageFileInput::open(&args.data_path)?;
  let backend = MedSamOnnxBuilder::from_url(&args.model)?
    .device_override(args.device)
    .build()?;
  let segmenter = Segmenter::new(backend);

  let mut outputs = vec![OutputWrapper::SaveImageFileOutput(
    SaveImageFileOutput::in_dir(&args.seg_path, &args.data_path),
  )];
  if let Some(preview) = &args.preview {
    outputs.push(OutputWrapper::PreviewOutput(PreviewOutput::new(preview)));
  }
  for url in &args.outputs {
    info!("附加输出: {}", url);
    outputs.push(OutputWrapper::from_url(url)?);
  }

  let bbox = args.bbox;
  let requests = input.map(move |image| SegmentRequest { image, bbox });
  OneShotTask.run_task(requests, segmenter, outputs)?;

  Ok(())
}
