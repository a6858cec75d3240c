// 该文件是 Zhaopian （照片） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageReader};
use thiserror::Error;
use tracing::{debug, warn};

use crate::frame::{PhotoFrame, display_name};

/// 描述模型使用的缩略图边长上限
pub const CAPTION_MAX_SIDE: u32 = 512;

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 图像文件读取器
///
/// 解码后统一转换为 RGB；设置了 `max_side` 时按比例缩小到该边长以内，
/// 不会放大小图。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileInput {
  max_side: Option<u32>,
}

impl ImageFileInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_max_side(mut self, max_side: Option<u32>) -> Self {
    self.max_side = max_side;
    self
  }

  pub fn max_side(&self) -> Option<u32> {
    self.max_side
  }

  pub fn open(&self, index: usize, path: &Path) -> Result<PhotoFrame, ImageFileInputError> {
    let name = display_name(path);
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;

    let color = image.color();
    if !matches!(color, ColorType::Rgb8 | ColorType::L8) {
      warn!("图像 {} 的颜色模式为 {:?}，转换为 RGB", name, color);
    }

    let image = match self.max_side {
      Some(max_side) => shrink_to_fit(image, max_side),
      None => image,
    };
    let image = image.to_rgb8();

    debug!(
      "图像 {} 已加载 | 尺寸: {}x{} | 原始模式: {:?}",
      name,
      image.width(),
      image.height(),
      color
    );

    Ok(PhotoFrame::new(index, path, image))
  }
}

fn shrink_to_fit(image: DynamicImage, max_side: u32) -> DynamicImage {
  if image.width() <= max_side && image.height() <= max_side {
    return image;
  }
  image.resize(max_side, max_side, FilterType::Lanczos3)
}
