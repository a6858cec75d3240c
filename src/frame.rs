// 该文件是 Zhaopian （照片） 项目的一部分。
// src/frame.rs - 照片帧定义
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
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageResult, RgbImage};

const JPEG_QUALITY: u8 = 90;

/// 一张已解码的照片，附带其在批次中的位置
#[derive(Debug, Clone)]
pub struct PhotoFrame {
  /// 批次内索引（从 0 开始）
  pub index: usize,
  /// 源文件路径
  pub path: PathBuf,
  /// 源文件名，用于日志
  pub name: String,
  /// RGB 图像数据
  pub image: RgbImage,
}

impl PhotoFrame {
  pub fn new(index: usize, path: &Path, image: RgbImage) -> Self {
    Self {
      index,
      path: path.to_path_buf(),
      name: display_name(path),
      image,
    }
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  /// 编码为 JPEG 字节，作为推理服务的输入
  pub fn to_jpeg(&self) -> ImageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    self.image.write_with_encoder(encoder)?;
    Ok(buffer.into_inner())
  }

  pub fn to_base64_jpeg(&self) -> ImageResult<String> {
    Ok(STANDARD.encode(self.to_jpeg()?))
  }
}

/// 路径的文件名部分，无法取得时退回完整路径
pub fn display_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn jpeg_payload_starts_with_soi_marker() {
    let image = RgbImage::from_pixel(8, 6, Rgb([200, 10, 10]));
    let frame = PhotoFrame::new(0, Path::new("/tmp/red.png"), image);

    let jpeg = frame.to_jpeg().unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    assert_eq!(frame.name, "red.png");
    assert_eq!((frame.width(), frame.height()), (8, 6));

    let decoded = STANDARD.decode(frame.to_base64_jpeg().unwrap()).unwrap();
    assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
  }
}
