// 该文件是 Yixiang （医象） 项目的一部分。
// src/output/save_image_file.rs - 保存掩码图像
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

use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::SourceImage, model::Segmentation, output::Render, url_path,
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 保留完整的输入文件名再追加 `.png`：`scan.jpg` 得到 `seg_scan.jpg.png`
pub fn mask_file_name(input: &Path) -> String {
  let name = input
    .file_name()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "image".to_string());
  format!("seg_{}.png", name)
}

/// 把二值掩码保存为 0/255 的灰度 PNG
pub struct SaveImageFileOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput::new(url_path(uri)))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// 在 `dir` 下按输入文件名生成输出路径
  pub fn in_dir(dir: impl AsRef<Path>, input: &Path) -> Self {
    Self::new(dir.as_ref().join(mask_file_name(input)))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

pub(super) fn save_png(path: &Path, image: DynamicImage) -> Result<(), SaveImageFileError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }

  image.save_with_format(path, ImageFormat::Png)?;
  info!("保存图像到文件: {}", path.display());
  Ok(())
}

impl Render<SourceImage, Segmentation> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, _frame: &SourceImage, result: &Segmentation) -> Result<(), Self::Error> {
    let mask = result.mask.to_gray_image();
    save_png(&self.path, DynamicImage::ImageLuma8(mask))
  }
}
