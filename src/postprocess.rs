// 该文件是 Yixiang （医象） 项目的一部分。
// src/postprocess.rs - 掩码缩放与二值化
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

use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView2, Zip};
use tracing::debug;

use crate::model::RawLogits;

/// 前景概率阈值，严格大于才算前景
pub const MASK_THRESHOLD: f32 = 0.5;

pub fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

/// logits -> 原图尺寸的二值掩码，`size` 为原图 (H, W)
pub fn rescale(logits: &RawLogits, size: (usize, usize)) -> BinaryMask {
  debug!("掩码缩放: {:?} -> {:?}", logits.size(), size);
  ProbabilityMap::from_logits(logits)
    .resize_bilinear(size)
    .threshold(MASK_THRESHOLD)
    .resize_nearest(size)
}

/// 逐像素前景概率
#[derive(Debug, Clone)]
pub struct ProbabilityMap {
  data: Array2<f32>,
}

impl ProbabilityMap {
  pub fn from_logits(logits: &RawLogits) -> Self {
    Self {
      data: logits.view().mapv(sigmoid),
    }
  }

  pub fn from_array(data: Array2<f32>) -> Self {
    Self { data }
  }

  pub fn view(&self) -> ArrayView2<'_, f32> {
    self.data.view()
  }

  pub fn size(&self) -> (usize, usize) {
    self.data.dim()
  }

  /// 半像素中心对齐的双线性插值（角点不对齐）
  pub fn resize_bilinear(&self, size: (usize, usize)) -> Self {
    let (in_h, in_w) = self.data.dim();
    let (out_h, out_w) = size;
    if (in_h, in_w) == size {
      return self.clone();
    }
    if in_h == 0 || in_w == 0 {
      return Self::from_array(Array2::zeros(size));
    }

    let rows = linear_taps(in_h, out_h);
    let cols = linear_taps(in_w, out_w);
    let src = &self.data;

    let mut out = Array2::<f32>::zeros((out_h, out_w));
    Zip::indexed(&mut out).par_for_each(|(y, x), value| {
      let (y0, y1, wy) = rows[y];
      let (x0, x1, wx) = cols[x];
      let top = src[[y0, x0]] * (1.0 - wx) + src[[y0, x1]] * wx;
      let bottom = src[[y1, x0]] * (1.0 - wx) + src[[y1, x1]] * wx;
      *value = top * (1.0 - wy) + bottom * wy;
    });

    Self::from_array(out)
  }

  pub fn threshold(&self, threshold: f32) -> BinaryMask {
    BinaryMask::from_array(self.data.mapv(|p| p > threshold))
  }
}

/// 每个输出坐标对应的两个源索引及插值权重
///
/// `src = (dst + 0.5) * in / out - 0.5`，负值截为 0，右侧索引不超过 `in - 1`。
fn linear_taps(in_len: usize, out_len: usize) -> Vec<(usize, usize, f32)> {
  let scale = in_len as f32 / out_len as f32;
  let last = in_len - 1;
  (0..out_len)
    .map(|dst| {
      let src = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
      let i0 = (src as usize).min(last);
      let i1 = (i0 + 1).min(last);
      let weight = if i1 == i0 { 0.0 } else { src - i0 as f32 };
      (i0, i1, weight)
    })
    .collect()
}

/// 二值掩码，前景为 true
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
  data: Array2<bool>,
}

impl BinaryMask {
  pub fn from_array(data: Array2<bool>) -> Self {
    Self { data }
  }

  pub fn view(&self) -> ArrayView2<'_, bool> {
    self.data.view()
  }

  pub fn height(&self) -> usize {
    self.data.dim().0
  }

  pub fn width(&self) -> usize {
    self.data.dim().1
  }

  pub fn size(&self) -> (usize, usize) {
    self.data.dim()
  }

  pub fn get(&self, y: usize, x: usize) -> bool {
    self.data[[y, x]]
  }

  /// 前景像素数
  pub fn count(&self) -> usize {
    self.data.iter().filter(|&&v| v).count()
  }

  /// 最近邻缩放，不做抗混叠，不会产生新的边界值
  pub fn resize_nearest(self, size: (usize, usize)) -> Self {
    let (in_h, in_w) = self.data.dim();
    if (in_h, in_w) == size {
      return self;
    }
    if in_h == 0 || in_w == 0 {
      return Self::from_array(Array2::from_elem(size, false));
    }

    let rows = nearest_taps(in_h, size.0);
    let cols = nearest_taps(in_w, size.1);
    let data = Array2::from_shape_fn(size, |(y, x)| self.data[[rows[y], cols[x]]]);
    Self::from_array(data)
  }

  /// 灰度 PNG 用的 0/255 图像
  pub fn to_gray_image(&self) -> GrayImage {
    GrayImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
      Luma([if self.get(y as usize, x as usize) { 255 } else { 0 }])
    })
  }
}

fn nearest_taps(in_len: usize, out_len: usize) -> Vec<usize> {
  let scale = in_len as f32 / out_len as f32;
  let last = in_len - 1;
  (0..out_len)
    .map(|dst| {
      let src = ((dst as f32 + 0.5) * scale - 0.5).round().max(0.0);
      (src as usize).min(last)
    })
    .collect()
}
