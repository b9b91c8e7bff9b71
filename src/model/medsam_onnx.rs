// 该文件是 Yixiang （医象） 项目的一部分。
// src/model/medsam_onnx.rs - 基于 ONNX Runtime 的 MedSAM 后端
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

use std::{
  fmt,
  path::{Path, PathBuf},
  str::FromStr,
};

use ndarray::{Array3, Axis, Ix4};
use ort::{
  execution_providers::{CPUExecutionProvider, CUDAExecutionProvider},
  session::{Session, builder::GraphOptimizationLevel},
  value::TensorRef,
};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsNchwFrame, NormalizedTensor},
  model::{Embedding, RawLogits, SegmentationModel},
  prompt::ScaledBox,
  url_path,
};

const MEDSAM_SCHEME: &str = "medsam";
const ENCODER_FILE: &str = "encoder.onnx";
const DECODER_FILE: &str = "decoder.onnx";

const ENCODER_INPUT: &str = "image";
const ENCODER_OUTPUT: &str = "image_embeddings";
const DECODER_EMBEDDING_INPUT: &str = "image_embeddings";
const DECODER_BOX_INPUT: &str = "boxes";
const DECODER_OUTPUT: &str = "low_res_logits";

#[derive(Error, Debug)]
pub enum MedSamOnnxError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型输出形状错误: {0}")]
  OutputShape(#[from] ndarray::ShapeError),
  #[error("模型缺少输出: {0}")]
  MissingOutput(&'static str),
  #[error("无效的设备: '{0}'，应为 cpu 或 cuda:N")]
  InvalidDevice(String),
}

/// 推理设备
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
  #[default]
  Cpu,
  Cuda(i32),
}

impl FromStr for Device {
  type Err = MedSamOnnxError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let lower = s.trim().to_ascii_lowercase();
    match lower.as_str() {
      "cpu" => Ok(Device::Cpu),
      "cuda" => Ok(Device::Cuda(0)),
      other => other
        .strip_prefix("cuda:")
        .and_then(|id| id.parse::<i32>().ok())
        .filter(|id| *id >= 0)
        .map(Device::Cuda)
        .ok_or_else(|| MedSamOnnxError::InvalidDevice(s.to_string())),
    }
  }
}

impl fmt::Display for Device {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Device::Cpu => write!(f, "cpu"),
      Device::Cuda(id) => write!(f, "cuda:{}", id),
    }
  }
}

pub struct MedSamOnnxBuilder {
  model_dir: PathBuf,
  device: Device,
  intra_threads: Option<usize>,
}

/// `medsam:<目录>`，目录下需有 encoder.onnx 与 decoder.onnx
///
/// 可选查询参数：`device=cuda:0`、`threads=4`。
impl FromUrl for MedSamOnnxBuilder {
  type Error = MedSamOnnxError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != MEDSAM_SCHEME {
      return Err(MedSamOnnxError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        MEDSAM_SCHEME
      )));
    }

    let mut builder = MedSamOnnxBuilder::new(url_path(url));
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "device" => builder.device = value.parse()?,
        "threads" => {
          let threads = value
            .parse::<usize>()
            .map_err(|_| MedSamOnnxError::ModelPathError(format!("无效的线程数: {}", value)))?;
          builder.intra_threads = Some(threads);
        }
        other => debug!("忽略未知参数: {}", other),
      }
    }
    Ok(builder)
  }
}

impl FromUrlWithScheme for MedSamOnnxBuilder {
  const SCHEME: &'static str = MEDSAM_SCHEME;
}

impl MedSamOnnxBuilder {
  pub fn new(model_dir: impl Into<PathBuf>) -> Self {
    Self {
      model_dir: model_dir.into(),
      device: Device::Cpu,
      intra_threads: None,
    }
  }

  pub fn device(mut self, device: Device) -> Self {
    self.device = device;
    self
  }

  /// 命令行显式给出设备时才覆盖 URL 中的 `device=`
  pub fn device_override(self, device: Option<Device>) -> Self {
    match device {
      Some(device) => self.device(device),
      None => self,
    }
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = Some(threads);
    self
  }

  pub fn model_dir(&self) -> &Path {
    &self.model_dir
  }

  pub fn build(self) -> Result<MedSamOnnx, MedSamOnnxError> {
    let encoder_path = self.model_dir.join(ENCODER_FILE);
    let decoder_path = self.model_dir.join(DECODER_FILE);
    for path in [&encoder_path, &decoder_path] {
      if !path.is_file() {
        return Err(MedSamOnnxError::ModelNotFound(path.clone()));
      }
    }

    info!("加载编码器: {}", encoder_path.display());
    let encoder = self.open_session(&encoder_path)?;
    info!("加载解码器: {}", decoder_path.display());
    let decoder = self.open_session(&decoder_path)?;
    info!("模型加载完成，设备: {}", self.device);

    Ok(MedSamOnnx {
      encoder: Mutex::new(encoder),
      decoder: Mutex::new(decoder),
      device: self.device,
    })
  }

  fn open_session(&self, path: &Path) -> Result<Session, MedSamOnnxError> {
    let mut builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
    if let Some(threads) = self.intra_threads {
      builder = builder.with_intra_threads(threads)?;
    }

    let builder = match self.device {
      Device::Cpu => builder.with_execution_providers([CPUExecutionProvider::default().build()])?,
      Device::Cuda(id) => {
        warn!("使用 CUDA 设备 {}，注册失败时由 ONNX Runtime 退回 CPU", id);
        builder.with_execution_providers([
          CUDAExecutionProvider::default().with_device_id(id).build(),
          CPUExecutionProvider::default().build(),
        ])?
      }
    };

    let session = builder.commit_from_file(path)?;
    for input in &session.inputs {
      debug!("模型输入: {} {:?}", input.name, input.input_type);
    }
    for output in &session.outputs {
      debug!("模型输出: {} {:?}", output.name, output.output_type);
    }
    Ok(session)
  }
}

/// MedSAM 编码器与解码器
///
/// ONNX Runtime 的会话运行需要可变引用，这里各用一把锁保护，
/// 同一时刻每个会话只处理一个请求。
pub struct MedSamOnnx {
  encoder: Mutex<Session>,
  decoder: Mutex<Session>,
  device: Device,
}

impl MedSamOnnx {
  pub fn device(&self) -> Device {
    self.device
  }
}

impl SegmentationModel for MedSamOnnx {
  type Error = MedSamOnnxError;

  fn encode(&self, tensor: NormalizedTensor) -> Result<Embedding, Self::Error> {
    let input = TensorRef::from_array_view(tensor.as_nchw())?;

    let now = std::time::Instant::now();
    let mut session = self.encoder.lock();
    let outputs = session.run(ort::inputs![ENCODER_INPUT => input])?;
    let embedding = outputs
      .get(ENCODER_OUTPUT)
      .ok_or(MedSamOnnxError::MissingOutput(ENCODER_OUTPUT))?
      .try_extract_array::<f32>()?
      .into_dimensionality::<Ix4>()?
      .to_owned();
    debug!("编码器推理耗时: {:.2?}", now.elapsed());

    Ok(Embedding::new(embedding))
  }

  fn decode(&self, embedding: &Embedding, bbox: &ScaledBox) -> Result<RawLogits, Self::Error> {
    let coords = bbox.to_array();
    let boxes = Array3::from_shape_fn((1, 1, 4), |(_, _, i)| coords[i]);
    let embedding = TensorRef::from_array_view(embedding.view())?;
    let boxes = TensorRef::from_array_view(boxes.view())?;

    let now = std::time::Instant::now();
    let mut session = self.decoder.lock();
    let outputs = session.run(ort::inputs![
      DECODER_EMBEDDING_INPUT => embedding,
      DECODER_BOX_INPUT => boxes
    ])?;
    let logits = outputs
      .get(DECODER_OUTPUT)
      .ok_or(MedSamOnnxError::MissingOutput(DECODER_OUTPUT))?
      .try_extract_array::<f32>()?
      .into_dimensionality::<Ix4>()?
      .index_axis_move(Axis(0), 0)
      .index_axis_move(Axis(0), 0)
      .to_owned();
    debug!("解码器推理耗时: {:.2?}, 输出 {:?}", now.elapsed(), logits.dim());

    Ok(RawLogits::new(logits))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_devices() {
    assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
    assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda(0));
    assert_eq!("cuda:3".parse::<Device>().unwrap(), Device::Cuda(3));
    assert_eq!(Device::Cuda(1).to_string(), "cuda:1");

    for bad in ["gpu", "cuda:", "cuda:-1", "cuda:x", ""] {
      assert!(matches!(bad.parse::<Device>(), Err(MedSamOnnxError::InvalidDevice(_))));
    }
  }

  #[test]
  fn builder_reads_directory_and_query() {
    let url = Url::parse("medsam:work_dir/MedSAM?device=cuda:1&threads=4").unwrap();
    let builder = MedSamOnnxBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_dir(), Path::new("work_dir/MedSAM"));
    assert_eq!(builder.device, Device::Cuda(1));
    assert_eq!(builder.intra_threads, Some(4));
  }

  #[test]
  fn url_device_survives_without_explicit_override() {
    let url = Url::parse("medsam:work_dir/MedSAM?device=cuda:1").unwrap();

    let kept = MedSamOnnxBuilder::from_url(&url).unwrap().device_override(None);
    assert_eq!(kept.device, Device::Cuda(1));

    let forced = MedSamOnnxBuilder::from_url(&url)
      .unwrap()
      .device_override(Some(Device::Cpu));
    assert_eq!(forced.device, Device::Cpu);

    let plain = Url::parse("medsam:work_dir/MedSAM").unwrap();
    let default = MedSamOnnxBuilder::from_url(&plain).unwrap().device_override(None);
    assert_eq!(default.device, Device::Cpu);
  }

  #[test]
  fn builder_rejects_other_schemes() {
    let url = Url::parse("yolo:///models/a.onnx").unwrap();
    assert!(matches!(
      MedSamOnnxBuilder::from_url(&url),
      Err(MedSamOnnxError::ModelPathError(_))
    ));
  }

  #[test]
  fn missing_model_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = MedSamOnnxBuilder::new(dir.path()).build().err().unwrap();
    match err {
      MedSamOnnxError::ModelNotFound(path) => assert!(path.ends_with(ENCODER_FILE)),
      other => panic!("unexpected error: {other}"),
    }
  }
}
