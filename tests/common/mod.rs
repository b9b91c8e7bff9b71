// 该文件是 Yixiang （医象） 项目的一部分。
// tests/common/mod.rs - 测试用的模型替身
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

#![allow(dead_code)]

use std::convert::Infallible;

use image::{ImageFormat, RgbImage};
use ndarray::{Array2, Array4};
use yixiang::{
  frame::{MODEL_INPUT_SIZE, NormalizedTensor},
  model::{Embedding, RawLogits, SegmentationModel},
  prompt::ScaledBox,
};

pub const INSIDE_LOGIT: f32 = 10.0;
pub const OUTSIDE_LOGIT: f32 = -10.0;

/// 在模型坐标下把边界框内部判为前景
///
/// 输出 1024x1024 的 logits：`[x1, x2) x [y1, y2)` 内为正，其余为负。
pub struct BoxStub;

impl SegmentationModel for BoxStub {
  type Error = Infallible;

  fn encode(&self, tensor: NormalizedTensor) -> Result<Embedding, Self::Error> {
    assert_eq!(tensor.shape(), &NormalizedTensor::SHAPE);
    Ok(Embedding::new(Array4::zeros((1, 256, 64, 64))))
  }

  fn decode(&self, _embedding: &Embedding, bbox: &ScaledBox) -> Result<RawLogits, Self::Error> {
    let inside = |v: usize, lo: f32, hi: f32| (v as f32) >= lo && (v as f32) < hi;
    let logits = Array2::from_shape_fn((MODEL_INPUT_SIZE, MODEL_INPUT_SIZE), |(y, x)| {
      if inside(x, bbox.x1, bbox.x2) && inside(y, bbox.y1, bbox.y2) {
        INSIDE_LOGIT
      } else {
        OUTSIDE_LOGIT
      }
    });
    Ok(RawLogits::new(logits))
  }
}

pub fn black_png(width: u32, height: u32) -> Vec<u8> {
  let mut bytes = Vec::new();
  RgbImage::new(width, height)
    .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
    .expect("encode png");
  bytes
}
