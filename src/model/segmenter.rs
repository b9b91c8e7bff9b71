// 该文件是 Yixiang （医象） 项目的一部分。
// src/model/segmenter.rs - 边界框提示分割流程
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

use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::{FrameError, SourceImage},
  model::{Model, SegmentationModel},
  overlay::{OverlayColor, colorize},
  postprocess::{self, BinaryMask},
  preprocess,
  prompt::{BoundingBox, ScaledBox},
};

#[derive(Error, Debug)]
pub enum SegmentError<E: std::error::Error + 'static> {
  #[error("图像预处理错误: {0}")]
  Frame(#[from] FrameError),
  #[error("模型推理错误: {0}")]
  Model(#[source] E),
}

/// 一次分割请求：原图与原图坐标下的边界框
#[derive(Debug, Clone)]
pub struct SegmentRequest {
  pub image: SourceImage,
  pub bbox: BoundingBox,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
  /// 与原图同尺寸的二值掩码
  pub mask: BinaryMask,
  /// 请求中的边界框
  pub bbox: BoundingBox,
  /// 送入解码器的模型坐标边界框
  pub scaled_box: ScaledBox,
}

impl Segmentation {
  pub fn overlay(&self, color: OverlayColor) -> RgbaImage {
    colorize(&self.mask, color)
  }
}

/// 持有模型句柄的分割流程
///
/// 模型在启动时构建一次并显式传入；流程本身只读，可在多个请求间共享，
/// 后端需要独占访问时由后端自行加锁。
pub struct Segmenter<B> {
  backend: B,
}

impl<B: SegmentationModel> Segmenter<B> {
  pub fn new(backend: B) -> Self {
    Self { backend }
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub fn segment(
    &self,
    image: &SourceImage,
    bbox: &BoundingBox,
  ) -> Result<Segmentation, SegmentError<B::Error>> {
    let size = image.size();
    debug!("开始分割: 原图 {}x{}, 边界框 {}", size.1, size.0, bbox);

    let now = std::time::Instant::now();
    let tensor = preprocess::normalize(image)?;
    debug!("预处理完成，耗时: {:.2?}", now.elapsed());

    let embedding = self.backend.encode(tensor).map_err(SegmentError::Model)?;
    debug!("编码完成，特征形状: {:?}", embedding.shape());

    let scaled_box = bbox.to_model_space(size);
    let logits = self
      .backend
      .decode(&embedding, &scaled_box)
      .map_err(SegmentError::Model)?;

    let mask = postprocess::rescale(&logits, size);
    info!(
      "分割完成，耗时: {:.2?}，前景像素: {}",
      now.elapsed(),
      mask.count()
    );

    Ok(Segmentation {
      mask,
      bbox: *bbox,
      scaled_box,
    })
  }
}

impl<B: SegmentationModel> Model for Segmenter<B> {
  type Input = SegmentRequest;
  type Output = Segmentation;
  type Error = SegmentError<B::Error>;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.segment(&input.image, &input.bbox)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::{AsNchwFrame, NormalizedTensor},
    model::{Embedding, RawLogits},
  };
  use ndarray::{Array2, Array4, ArrayD, IxDyn};
  use std::cell::Cell;

  #[derive(Error, Debug)]
  #[error("decoder unavailable")]
  struct DecoderDown;

  /// 记录收到的边界框，输出全前景
  struct Recording {
    last_box: Cell<Option<ScaledBox>>,
    fail_decode: bool,
  }

  impl SegmentationModel for Recording {
    type Error = DecoderDown;

    fn encode(&self, tensor: NormalizedTensor) -> Result<Embedding, Self::Error> {
      assert_eq!(tensor.shape(), &NormalizedTensor::SHAPE);
      let mean = tensor.as_nchw().mean().unwrap_or(0.0);
      Ok(Embedding::new(Array4::from_elem((1, 1, 1, 1), mean)))
    }

    fn decode(&self, _: &Embedding, bbox: &ScaledBox) -> Result<RawLogits, Self::Error> {
      if self.fail_decode {
        return Err(DecoderDown);
      }
      self.last_box.set(Some(*bbox));
      Ok(RawLogits::new(Array2::from_elem((256, 256), 8.0)))
    }
  }

  fn gray_image(height: usize, width: usize) -> SourceImage {
    let array = ArrayD::from_shape_fn(IxDyn(&[height, width]), |idx| (idx[0] % 256) as u8);
    SourceImage::from_array(array).unwrap()
  }

  #[test]
  fn decoder_receives_box_in_model_space() {
    let segmenter = Segmenter::new(Recording {
      last_box: Cell::new(None),
      fail_decode: false,
    });
    let bbox = BoundingBox::new(50, 25, 150, 75);
    let result = segmenter.segment(&gray_image(100, 200), &bbox).unwrap();

    let seen = segmenter.backend().last_box.get().unwrap();
    assert_eq!(seen, result.scaled_box);
    assert_eq!(seen.to_array(), [256.0, 256.0, 768.0, 768.0]);
    assert_eq!(result.bbox, bbox);
    assert_eq!(result.mask.size(), (100, 200));
    assert_eq!(result.mask.count(), 100 * 200);
  }

  #[test]
  fn model_errors_are_propagated() {
    let segmenter = Segmenter::new(Recording {
      last_box: Cell::new(None),
      fail_decode: true,
    });
    let request = SegmentRequest {
      image: gray_image(8, 8),
      bbox: BoundingBox::new(0, 0, 4, 4),
    };
    assert!(matches!(
      segmenter.infer(&request),
      Err(SegmentError::Model(DecoderDown))
    ));
  }
}
