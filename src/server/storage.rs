// 该文件是 Yixiang （医象） 项目的一部分。
// src/server/storage.rs - 上传图像存储
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

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  frame::SourceImage,
  input::{ImageFileInputError, load_image},
};

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("图像不存在: {0}")]
  NotFound(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像读取错误: {0}")]
  Decode(#[from] ImageFileInputError),
}

/// 上传目录，文件名为 `<uuid>.png`
///
/// 保存时不转码，读取时按内容识别格式。
#[derive(Debug, Clone)]
pub struct UploadStore {
  dir: PathBuf,
  max_file_size: usize,
}

impl UploadStore {
  pub fn create(dir: impl Into<PathBuf>, max_file_size: usize) -> Result<Self, StoreError> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir)?;
    info!("上传目录: {}", dir.display());
    Ok(Self { dir, max_file_size })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn max_file_size(&self) -> usize {
    self.max_file_size
  }

  pub fn path_of(&self, id: &Uuid) -> PathBuf {
    self.dir.join(format!("{}.png", id))
  }

  pub fn save(&self, bytes: &[u8]) -> Result<Uuid, StoreError> {
    let id = Uuid::new_v4();
    let path = self.path_of(&id);
    std::fs::write(&path, bytes)?;
    debug!("保存上传文件: {} ({} 字节)", path.display(), bytes.len());
    Ok(id)
  }

  /// 只接受 UUID 形式的标识，其余一律视为不存在
  pub fn load(&self, id: &str) -> Result<SourceImage, StoreError> {
    let not_found = || StoreError::NotFound(id.to_string());
    let uuid = Uuid::parse_str(id).map_err(|_| not_found())?;
    let path = self.path_of(&uuid);
    if !path.is_file() {
      return Err(not_found());
    }
    Ok(load_image(&path)?)
  }
}
