// 该文件是 Zhaopian （照片） 项目的一部分。
// src/input.rs - 照片输入
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

use std::path::PathBuf;

use crate::frame::PhotoFrame;

mod read_image_file;
pub use self::read_image_file::{CAPTION_MAX_SIDE, ImageFileInput, ImageFileInputError};

/// 批次中的一个位置：加载失败只影响该项
#[derive(Debug)]
pub struct PhotoSlot {
  pub index: usize,
  pub path: PathBuf,
  pub frame: Result<PhotoFrame, ImageFileInputError>,
}

/// 按顺序惰性加载的照片序列
pub struct PhotoInput {
  paths: std::vec::IntoIter<PathBuf>,
  reader: ImageFileInput,
  next_index: usize,
  total: usize,
}

impl PhotoInput {
  pub fn new(paths: Vec<PathBuf>, reader: ImageFileInput) -> Self {
    let total = paths.len();
    Self {
      paths: paths.into_iter(),
      reader,
      next_index: 0,
      total,
    }
  }

  pub fn total(&self) -> usize {
    self.total
  }
}

impl Iterator for PhotoInput {
  type Item = PhotoSlot;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.paths.next()?;
    let index = self.next_index;
    self.next_index += 1;
    let frame = self.reader.open(index, &path);
    Some(PhotoSlot { index, path, frame })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.paths.size_hint()
  }
}

impl ExactSizeIterator for PhotoInput {}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn slots_keep_order_and_isolate_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])).save(&good).unwrap();
    let missing = dir.path().join("missing.png");

    let input = PhotoInput::new(
      vec![good.clone(), missing.clone(), good.clone()],
      ImageFileInput::new(),
    );
    assert_eq!(input.total(), 3);

    let slots: Vec<_> = input.collect();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[1].index, 1);
    assert_eq!(slots[1].path, missing);
    assert!(slots[0].frame.is_ok());
    assert!(slots[1].frame.is_err());
    assert_eq!(slots[2].frame.as_ref().unwrap().index, 2);
  }
}
