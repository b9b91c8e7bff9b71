// 该文件是 Yixiang （医象） 项目的一部分。
// src/overlay.rs - 掩码着色
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

use image::{Rgba, RgbaImage};
use rand::Rng;

use crate::postprocess::BinaryMask;

/// 前景像素的不透明度
pub const OVERLAY_ALPHA: f32 = 0.6;
/// 颜色变暗系数，越小越暗
pub const DARKEN_FACTOR: f32 = 0.5;

/// 覆盖层颜色，RGB 分量位于 [0, 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayColor {
  rgb: [f32; 3],
}

impl OverlayColor {
  /// 每次请求随机取一种颜色
  pub fn random() -> Self {
    Self::from_rng(&mut rand::rng())
  }

  pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
    Self {
      rgb: [rng.random(), rng.random(), rng.random()],
    }
  }

  pub fn from_rgb(rgb: [f32; 3]) -> Self {
    Self {
      rgb: rgb.map(|c| c.clamp(0.0, 1.0)),
    }
  }

  pub fn rgb(&self) -> [f32; 3] {
    self.rgb
  }

  pub fn darker(&self) -> [f32; 3] {
    self.rgb.map(|c| c * DARKEN_FACTOR)
  }
}

/// 把二值掩码变为半透明 RGBA 覆盖层
///
/// 掩码在合成过程中始终取 0/1：前景为变暗后的颜色、不透明度 0.6，
/// 背景四个通道全为 0。最后乘 255 截断为 8 位。
pub fn colorize(mask: &BinaryMask, color: OverlayColor) -> RgbaImage {
  paint(mask, color.darker())
}

/// 与 [`colorize`] 相同，但前景直接使用原色，不做变暗
pub fn tint(mask: &BinaryMask, color: OverlayColor) -> RgbaImage {
  paint(mask, color.rgb())
}

fn paint(mask: &BinaryMask, rgb: [f32; 3]) -> RgbaImage {
  let (height, width) = mask.size();

  RgbaImage::from_fn(width as u32, height as u32, |x, y| {
    let m = if mask.get(y as usize, x as usize) { 1.0 } else { 0.0 };
    Rgba([
      to_u8(m * rgb[0]),
      to_u8(m * rgb[1]),
      to_u8(m * rgb[2]),
      to_u8(m * OVERLAY_ALPHA),
    ])
  })
}

fn to_u8(value: f32) -> u8 {
  (value * 255.0) as u8
}
