// 该文件是 Yixiang （医象） 项目的一部分。
// src/output/encode.rs - PNG 编码
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

use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, ImageFormat};

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
  let mut buffer = Vec::new();
  image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
  Ok(buffer)
}

/// PNG 编码后再做标准 base64，用于 JSON 响应
pub fn encode_png_base64(image: &DynamicImage) -> Result<String, image::ImageError> {
  let png = encode_png(image)?;
  Ok(base64::engine::general_purpose::STANDARD.encode(png))
}
