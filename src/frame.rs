// 该文件是 Yixiang （医象） 项目的一部分。
// src/frame.rs - 输入图像与张量定义
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

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use ndarray::{Array2, Array3, Array4, ArrayD, ArrayView2, ArrayView3, ArrayView4, Axis, Ix2, Ix3};
use thiserror::Error;

pub const RGB_CHANNELS: usize = 3;

/// 模型输入边长，MedSAM ViT-B 固定为 1024
pub const MODEL_INPUT_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("图像为空: {height}x{width}")]
  EmptyImage { height: usize, width: usize },
  #[error("不支持的图像维度: {0:?}")]
  UnsupportedShape(Vec<usize>),
  #[error("不支持的通道数: {0}")]
  UnsupportedChannels(usize),
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

pub trait AsNchwFrame {
  fn as_nchw(&self) -> ArrayView4<'_, f32>;
}

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> ArrayView3<'_, u8>;
}

/// 原始输入图像，统一为 HWC 排列的三通道 8 位数据
#[derive(Debug, Clone)]
pub struct SourceImage {
  data: Array3<u8>,
}

impl SourceImage {
  /// 接受 (H, W)、(H, W, 1) 或 (H, W, 3) 形状的数组，单通道会复制为三通道
  pub fn from_array(array: ArrayD<u8>) -> Result<Self, FrameError> {
    let shape = array.shape().to_vec();
    let data = match shape.len() {
      2 => {
        let gray = array
          .into_dimensionality::<Ix2>()
          .map_err(|_| FrameError::UnsupportedShape(shape.clone()))?;
        replicate_gray(gray.view())
      }
      3 => {
        let hwc = array
          .into_dimensionality::<Ix3>()
          .map_err(|_| FrameError::UnsupportedShape(shape.clone()))?;
        match hwc.dim().2 {
          1 => replicate_gray(hwc.index_axis(Axis(2), 0)),
          RGB_CHANNELS => hwc,
          channels => return Err(FrameError::UnsupportedChannels(channels)),
        }
      }
      _ => return Err(FrameError::UnsupportedShape(shape)),
    };

    Self::from_hwc(data)
  }

  pub fn from_hwc(data: Array3<u8>) -> Result<Self, FrameError> {
    let (height, width, channels) = data.dim();
    if channels != RGB_CHANNELS {
      return Err(FrameError::UnsupportedChannels(channels));
    }
    if height == 0 || width == 0 {
      return Err(FrameError::EmptyImage { height, width });
    }
    Ok(Self { data })
  }

  pub fn height(&self) -> usize {
    self.data.dim().0
  }

  pub fn width(&self) -> usize {
    self.data.dim().1
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 原图尺寸 (H, W)
  pub fn size(&self) -> (usize, usize) {
    (self.height(), self.width())
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    let data = &self.data;
    RgbImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
      let (x, y) = (x as usize, y as usize);
      Rgb([data[[y, x, 0]], data[[y, x, 1]], data[[y, x, 2]]])
    })
  }
}

impl AsNhwcFrame for SourceImage {
  fn as_nhwc(&self) -> ArrayView3<'_, u8> {
    self.data.view()
  }
}

fn replicate_gray(gray: ArrayView2<'_, u8>) -> Array3<u8> {
  let (height, width) = gray.dim();
  Array3::from_shape_fn((height, width, RGB_CHANNELS), |(y, x, _)| gray[[y, x]])
}

impl TryFrom<RgbImage> for SourceImage {
  type Error = FrameError;

  fn try_from(image: RgbImage) -> Result<Self, Self::Error> {
    let (width, height) = image.dimensions();
    let expected = RGB_CHANNELS * width as usize * height as usize;
    let raw = image.into_raw();
    let actual = raw.len();
    let data = Array3::from_shape_vec((height as usize, width as usize, RGB_CHANNELS), raw)
      .map_err(|_| FrameError::LengthMismatch { expected, actual })?;
    Self::from_hwc(data)
  }
}

impl TryFrom<GrayImage> for SourceImage {
  type Error = FrameError;

  fn try_from(image: GrayImage) -> Result<Self, Self::Error> {
    let (width, height) = image.dimensions();
    let expected = width as usize * height as usize;
    let raw = image.into_raw();
    let actual = raw.len();
    let gray = Array2::from_shape_vec((height as usize, width as usize), raw)
      .map_err(|_| FrameError::LengthMismatch { expected, actual })?;
    Self::from_hwc(replicate_gray(gray.view()))
  }
}

impl TryFrom<DynamicImage> for SourceImage {
  type Error = FrameError;

  fn try_from(image: DynamicImage) -> Result<Self, Self::Error> {
    match image {
      DynamicImage::ImageLuma8(gray) => Self::try_from(gray),
      gray @ (DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_)) => {
        Self::try_from(gray.to_luma8())
      }
      // 透明通道直接丢弃
      other => Self::try_from(other.to_rgb8()),
    }
  }
}

/// 归一化后的模型输入，形状固定为 (1, 3, 1024, 1024)，取值范围 [0, 1]
#[derive(Debug, Clone)]
pub struct NormalizedTensor {
  data: Array4<f32>,
}

impl NormalizedTensor {
  pub const SHAPE: [usize; 4] = [1, RGB_CHANNELS, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE];

  pub fn from_nchw(data: Array4<f32>) -> Result<Self, FrameError> {
    if data.shape() != Self::SHAPE {
      return Err(FrameError::UnsupportedShape(data.shape().to_vec()));
    }
    Ok(Self { data })
  }

  pub fn shape(&self) -> &[usize] {
    self.data.shape()
  }

  pub fn into_array(self) -> Array4<f32> {
    self.data
  }
}

impl AsNchwFrame for NormalizedTensor {
  fn as_nchw(&self) -> ArrayView4<'_, f32> {
    self.data.view()
  }
}
