// 该文件是 Yixiang （医象） 项目的一部分。
// src/preprocess.rs - 图像归一化
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

use image::{
  Rgb, Rgb32FImage,
  imageops::{self, FilterType},
};
use ndarray::{Array3, Axis};
use tracing::debug;

use crate::frame::{
  AsNhwcFrame, FrameError, MODEL_INPUT_SIZE, NormalizedTensor, RGB_CHANNELS, SourceImage,
};

/// 归一化时分母的下限，常量图像归一化为全零
const NORMALIZE_EPSILON: f32 = 1e-8;

/// 把任意尺寸的图像变换为模型输入张量
///
/// 1. 三次插值（带抗混叠）缩放到 1024x1024，结果存为 8 位
/// 2. 按全局最小/最大值归一化到 [0, 1]
/// 3. HWC 转为 CHW 并补上 batch 维
pub fn normalize(image: &SourceImage) -> Result<NormalizedTensor, FrameError> {
  let resized = resize_to_model_input(image);
  let unit = min_max_normalize(&resized);

  let nchw = unit
    .permuted_axes([2, 0, 1])
    .insert_axis(Axis(0))
    .as_standard_layout()
    .into_owned();

  NormalizedTensor::from_nchw(nchw)
}

/// 缩放到模型输入尺寸，保持 0..255 的取值范围
///
/// 插值在单位范围的浮点图上进行，`imageops::resize` 对浮点像素按 [0, 1] 截断，
/// 这样不会丢失取值范围；缩小时滤波核随缩放比例展宽，起到抗混叠作用。
pub fn resize_to_model_input(image: &SourceImage) -> Array3<u8> {
  let (height, width) = image.size();
  let pixels = image.as_nhwc();

  let unit = Rgb32FImage::from_fn(width as u32, height as u32, |x, y| {
    let (x, y) = (x as usize, y as usize);
    Rgb([
      f32::from(pixels[[y, x, 0]]) / 255.0,
      f32::from(pixels[[y, x, 1]]) / 255.0,
      f32::from(pixels[[y, x, 2]]) / 255.0,
    ])
  });

  let target = MODEL_INPUT_SIZE as u32;
  let resized = imageops::resize(&unit, target, target, FilterType::CatmullRom);
  debug!(
    "图像缩放: {}x{} -> {}x{}",
    width, height, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE
  );

  Array3::from_shape_fn(
    (MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, RGB_CHANNELS),
    |(y, x, c)| {
      let value = resized.get_pixel(x as u32, y as u32)[c];
      (value.clamp(0.0, 1.0) * 255.0).round() as u8
    },
  )
}

/// `(x - min) / max(max - min, 1e-8)`
pub fn min_max_normalize(image: &Array3<u8>) -> Array3<f32> {
  let (min, max) = image
    .iter()
    .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
  let min = f32::from(min);
  let range = (f32::from(max) - min).max(NORMALIZE_EPSILON);

  image.mapv(|v| (f32::from(v) - min) / range)
}
