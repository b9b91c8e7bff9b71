// 该文件是 Yixiang （医象） 项目的一部分。
// src/output/preview.rs - 分割结果预览图
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

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgba, RgbaImage, imageops};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::SourceImage,
  model::Segmentation,
  output::{
    Render,
    save_image_file::{SaveImageFileError, save_png},
  },
  overlay::{OverlayColor, tint},
  prompt::BoundingBox,
  url_path,
};

const BOX_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);
const PREVIEW_COLOR: [f32; 3] = [251.0 / 255.0, 252.0 / 255.0, 30.0 / 255.0];

/// 原图叠加掩码与边界框，便于人工检查
pub fn compose_preview(frame: &SourceImage, result: &Segmentation, color: OverlayColor) -> RgbaImage {
  let mut canvas = DynamicImage::ImageRgb8(frame.to_rgb_image()).to_rgba8();
  imageops::overlay(&mut canvas, &tint(&result.mask, color), 0, 0);
  draw_box(&mut canvas, &result.bbox);
  canvas
}

fn draw_box(canvas: &mut RgbaImage, bbox: &BoundingBox) {
  let (width, height) = (canvas.width() as i32, canvas.height() as i32);
  let x1 = bbox.x1.min(bbox.x2).clamp(0, width - 1);
  let y1 = bbox.y1.min(bbox.y2).clamp(0, height - 1);
  let x2 = bbox.x1.max(bbox.x2).clamp(0, width - 1);
  let y2 = bbox.y1.max(bbox.y2).clamp(0, height - 1);

  let (w, h) = ((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32);
  draw_hollow_rect_mut(canvas, Rect::at(x1, y1).of_size(w, h), BOX_COLOR);
}

pub struct PreviewOutput {
  path: PathBuf,
  color: OverlayColor,
}

impl FromUrlWithScheme for PreviewOutput {
  const SCHEME: &'static str = "preview";
}

impl FromUrl for PreviewOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    Ok(PreviewOutput::new(url_path(uri)))
  }
}

impl PreviewOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      color: OverlayColor::from_rgb(PREVIEW_COLOR),
    }
  }

  pub fn color(mut self, color: OverlayColor) -> Self {
    self.color = color;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<SourceImage, Segmentation> for PreviewOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &SourceImage, result: &Segmentation) -> Result<(), Self::Error> {
    let preview = compose_preview(frame, result, self.color);
    save_png(&self.path, DynamicImage::ImageRgba8(preview))
  }
}
