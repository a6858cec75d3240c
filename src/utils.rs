// 该文件是 Zhaopian （照片） 项目的一部分。
// src/utils.rs - 日志、临时目录与照片收集
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

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tif", "tiff"];

const UPLOAD_DIR_NAME: &str = "zhaopian";

#[derive(Error, Debug)]
pub enum LoggingError {
  #[error("无法创建日志文件: {0}")]
  IoError(#[from] io::Error),
  #[error("日志系统初始化失败: {0}")]
  InitError(#[from] TryInitError),
}

/// 初始化日志：控制台输出，另可写入日志目录下带时间戳的文件
///
/// 默认级别为 info，可通过 RUST_LOG 覆盖。返回日志文件路径。
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<PathBuf>, LoggingError> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  let log_file = match log_dir {
    Some(dir) => {
      fs::create_dir_all(dir)?;
      let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
      let path = dir.join(format!("log_{}.log", stamp));
      let file = OpenOptions::new().create(true).append(true).open(&path)?;
      Some((path, file))
    }
    None => None,
  };

  let (path, file_layer) = match log_file {
    Some((path, file)) => (
      Some(path),
      Some(
        fmt::layer()
          .with_writer(std::sync::Mutex::new(file))
          .with_ansi(false)
          .with_line_number(true),
      ),
    ),
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(io::stderr))
    .with(file_layer)
    .try_init()?;

  if let Some(path) = &path {
    info!("日志文件: {}", path.display());
  }
  Ok(path)
}

/// 上传照片的临时目录
pub fn upload_dir() -> PathBuf {
  std::env::temp_dir().join(UPLOAD_DIR_NAME)
}

/// 删除临时目录；目录不存在时返回 false
pub fn clear_temp_dir(dir: &Path) -> io::Result<bool> {
  info!("清理临时目录: {}", dir.display());
  if !dir.exists() {
    debug!("临时目录不存在，跳过清理");
    return Ok(false);
  }
  fs::remove_dir_all(dir)?;
  info!("临时目录已删除");
  Ok(true)
}

pub fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

/// 展开目录中的照片；显式给出的文件按原顺序保留，目录内容按路径排序
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
  let mut images = Vec::new();
  for path in paths {
    if !path.is_dir() {
      images.push(path.clone());
      continue;
    }

    let mut found: Vec<PathBuf> = WalkDir::new(path)
      .follow_links(false)
      .into_iter()
      .filter_map(Result::ok)
      .filter(|entry| entry.file_type().is_file())
      .map(|entry| entry.into_path())
      .filter(|path| {
        let keep = is_image_file(path);
        if !keep {
          debug!("跳过非图像文件: {}", path.display());
        }
        keep
      })
      .collect();
    found.sort();
    if found.is_empty() {
      warn!("目录中没有照片: {}", path.display());
    }
    images.extend(found);
  }
  images
}
