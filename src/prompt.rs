// 该文件是 Yixiang （医象） 项目的一部分。
// src/prompt.rs - 边界框提示与坐标映射
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

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::frame::MODEL_INPUT_SIZE;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的边界框格式: '{input}'，应为 'x1,y1,x2,y2'")]
pub struct BoxFormatError {
  input: String,
}

impl BoxFormatError {
  pub fn input(&self) -> &str {
    &self.input
  }
}

/// 原图像素坐标下的边界框 (x1, y1, x2, y2)
///
/// 不检查坐标顺序和范围，越界或反向的框会得到退化的掩码而不是错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl BoundingBox {
  pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  pub fn to_array(&self) -> [i32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }

  /// 映射到 1024x1024 的模型坐标空间，`size` 为原图 (H, W)
  ///
  /// x 按宽度缩放，y 按高度缩放，不取整也不截断。
  pub fn to_model_space(&self, size: (usize, usize)) -> ScaledBox {
    let (height, width) = (size.0 as f64, size.1 as f64);
    let side = MODEL_INPUT_SIZE as f64;
    let scale_x = |v: i32| (f64::from(v) / width * side) as f32;
    let scale_y = |v: i32| (f64::from(v) / height * side) as f32;

    ScaledBox {
      x1: scale_x(self.x1),
      y1: scale_y(self.y1),
      x2: scale_x(self.x2),
      y2: scale_y(self.y2),
    }
  }
}

impl fmt::Display for BoundingBox {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
  }
}

/// 解析 `x1,y1,x2,y2`，也接受命令行里的 `[x1, y1, x2, y2]` 写法
impl FromStr for BoundingBox {
  type Err = BoxFormatError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || BoxFormatError {
      input: s.to_string(),
    };

    let trimmed = s.trim();
    let inner = match trimmed.strip_prefix('[') {
      Some(rest) => rest.strip_suffix(']').ok_or_else(invalid)?,
      None => trimmed,
    };

    let coords = inner
      .split(',')
      .map(|part| part.trim().parse::<i32>())
      .collect::<Result<Vec<_>, _>>()
      .map_err(|_| invalid())?;

    match coords.as_slice() {
      &[x1, y1, x2, y2] => Ok(Self::new(x1, y1, x2, y2)),
      _ => Err(invalid()),
    }
  }
}

/// 模型坐标空间下的边界框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl ScaledBox {
  pub fn to_array(&self) -> [f32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }

  /// [`BoundingBox::to_model_space`] 的逆映射，结果保留小数
  pub fn to_image_space(&self, size: (usize, usize)) -> [f64; 4] {
    let (height, width) = (size.0 as f64, size.1 as f64);
    let side = MODEL_INPUT_SIZE as f64;
    [
      f64::from(self.x1) / side * width,
      f64::from(self.y1) / side * height,
      f64::from(self.x2) / side * width,
      f64::from(self.y2) / side * height,
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn parses_comma_separated_box() {
    let bbox: BoundingBox = "100,120,200,260".parse().unwrap();
    assert_eq!(bbox, BoundingBox::new(100, 120, 200, 260));
  }

  #[test]
  fn parses_bracketed_literal_with_spaces() {
    let bbox: BoundingBox = "[95, 255, 190, 350]".parse().unwrap();
    assert_eq!(bbox.to_array(), [95, 255, 190, 350]);
  }

  #[test]
  fn accepts_negative_and_reversed_coordinates() {
    let bbox: BoundingBox = "-5,40,3,-2".parse().unwrap();
    assert_eq!(bbox, BoundingBox::new(-5, 40, 3, -2));
  }

  #[test]
  fn rejects_malformed_boxes() {
    for input in [
      "",
      "1,2,3",
      "1,2,3,4,5",
      "1.5,2,3,4",
      "a,b,c,d",
      "[1,2,3,4",
      "1;2;3;4",
      "1,,3,4",
    ] {
      let err = input.parse::<BoundingBox>().unwrap_err();
      assert_eq!(err.input(), input);
    }
  }

  #[test]
  fn display_matches_request_format() {
    let bbox = BoundingBox::new(1, 2, 3, 4);
    assert_eq!(bbox.to_string(), "1,2,3,4");
    assert_eq!(bbox.to_string().parse::<BoundingBox>().unwrap(), bbox);
  }

  #[test]
  fn maps_x_by_width_and_y_by_height() {
    let scaled = BoundingBox::new(100, 100, 200, 200).to_model_space((256, 512));
    assert_relative_eq!(scaled.x1, 200.0);
    assert_relative_eq!(scaled.y1, 400.0);
    assert_relative_eq!(scaled.x2, 400.0);
    assert_relative_eq!(scaled.y2, 800.0);
  }

  #[test]
  fn out_of_bounds_boxes_are_not_clamped() {
    let scaled = BoundingBox::new(-10, 0, 600, 300).to_model_space((300, 500));
    assert!(scaled.x1 < 0.0);
    assert!(scaled.x2 > MODEL_INPUT_SIZE as f32);
    assert_relative_eq!(scaled.y2, 1024.0);
  }

  #[test]
  fn inverse_mapping_recovers_original_box() {
    let sizes = [(1, 1), (512, 512), (333, 777), (1080, 1920), (17, 4096)];
    let boxes = [
      BoundingBox::new(0, 0, 1, 1),
      BoundingBox::new(95, 255, 190, 350),
      BoundingBox::new(-20, 7, 5000, 12),
    ];

    for size in sizes {
      for bbox in boxes {
        let restored = bbox.to_model_space(size).to_image_space(size);
        for (orig, back) in bbox.to_array().iter().zip(restored) {
          assert_relative_eq!(f64::from(*orig), back, epsilon = 1e-3, max_relative = 1e-6);
        }
      }
    }
  }
}
