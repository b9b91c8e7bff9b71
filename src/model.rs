// 该文件是 Yixiang （医象） 项目的一部分。
// src/model.rs - 模型
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

use ndarray::{Array2, Array4, ArrayView2, ArrayView4};

use crate::{frame::NormalizedTensor, prompt::ScaledBox};

/// 一次完整的推理步骤：输入 -> 输出
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 分割网络的外部契约
///
/// 编码器把归一化张量变为固定形状的特征，解码器根据特征和模型坐标下的
/// 边界框给出单通道 logits。满足这两个接口的任何实现都可以替换使用。
pub trait SegmentationModel {
  type Error: std::error::Error + Send + Sync + 'static;

  fn encode(&self, tensor: NormalizedTensor) -> Result<Embedding, Self::Error>;
  fn decode(&self, embedding: &Embedding, bbox: &ScaledBox) -> Result<RawLogits, Self::Error>;
}

/// 编码器输出的图像特征，如 (1, 256, 64, 64)
#[derive(Debug, Clone)]
pub struct Embedding {
  data: Array4<f32>,
}

impl Embedding {
  pub fn new(data: Array4<f32>) -> Self {
    Self { data }
  }

  pub fn view(&self) -> ArrayView4<'_, f32> {
    self.data.view()
  }

  pub fn shape(&self) -> &[usize] {
    self.data.shape()
  }
}

/// 解码器输出的单通道 logits，分辨率由网络决定
#[derive(Debug, Clone)]
pub struct RawLogits {
  data: Array2<f32>,
}

impl RawLogits {
  pub fn new(data: Array2<f32>) -> Self {
    Self { data }
  }

  pub fn view(&self) -> ArrayView2<'_, f32> {
    self.data.view()
  }

  /// (H, W)
  pub fn size(&self) -> (usize, usize) {
    self.data.dim()
  }
}

mod segmenter;
pub use self::segmenter::{SegmentError, SegmentRequest, Segmentation, Segmenter};

#[cfg(feature = "model_medsam_onnx")]
mod medsam_onnx;
#[cfg(feature = "model_medsam_onnx")]
pub use self::medsam_onnx::{Device, MedSamOnnx, MedSamOnnxBuilder, MedSamOnnxError};
