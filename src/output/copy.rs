// 该文件是 Zhaopian （照片） 项目的一部分。
// src/output/copy.rs - 安全复制照片
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

use std::fmt;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, warn};

/// 一次复制：源文件 -> 目标路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
  pub src: PathBuf,
  pub dest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
  Saved { dest: PathBuf },
  NotFound { src: PathBuf },
  AlreadyExists { dest: PathBuf },
  Failed { dest: PathBuf, message: String },
}

impl SaveOutcome {
  pub fn is_saved(&self) -> bool {
    matches!(self, SaveOutcome::Saved { .. })
  }
}

impl fmt::Display for SaveOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SaveOutcome::Saved { dest } => write!(f, "已保存: {}", dest.display()),
      SaveOutcome::NotFound { src } => write!(f, "源文件不存在: {}", src.display()),
      SaveOutcome::AlreadyExists { dest } => write!(f, "目标文件已存在: {}", dest.display()),
      SaveOutcome::Failed { dest, message } => {
        write!(f, "保存 {} 失败: {}", dest.display(), message)
      }
    }
  }
}

fn copy_new(src: &Path, dest: &Path) -> io::Result<u64> {
  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent)?;
  }
  let mut reader = File::open(src)?;
  // create_new 保证并行复制时不会互相覆盖
  let mut writer = File::options().write(true).create_new(true).open(dest)?;
  io::copy(&mut reader, &mut writer)
}

/// 复制单个文件，从不覆盖已有文件
pub fn safe_copy(src: &Path, dest: &Path) -> SaveOutcome {
  if !src.is_file() {
    warn!("源文件不存在: {}", src.display());
    return SaveOutcome::NotFound {
      src: src.to_path_buf(),
    };
  }

  match copy_new(src, dest) {
    Ok(bytes) => {
      debug!("已复制 {} -> {} ({} 字节)", src.display(), dest.display(), bytes);
      SaveOutcome::Saved {
        dest: dest.to_path_buf(),
      }
    }
    Err(err) if err.kind() == ErrorKind::AlreadyExists => {
      warn!("目标文件已存在，跳过: {}", dest.display());
      SaveOutcome::AlreadyExists {
        dest: dest.to_path_buf(),
      }
    }
    Err(err) => {
      error!("复制 {} 失败: {}", src.display(), err);
      SaveOutcome::Failed {
        dest: dest.to_path_buf(),
        message: err.to_string(),
      }
    }
  }
}

/// 并行执行复制，结果与输入顺序一致
pub fn copy_all(plans: &[CopyPlan]) -> Vec<SaveOutcome> {
  plans
    .par_iter()
    .map(|plan| safe_copy(&plan.src, &plan.dest))
    .collect()
}
