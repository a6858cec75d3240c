// 该文件是 Zhaopian （照片） 项目的一部分。
// src/output.rs - 按结果表格保存照片
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

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::handler::Mode;

mod classification;
mod copy;
mod renaming;

pub use self::classification::{CLASSIFIED_DIR, ClassificationLayout};
pub use self::copy::{CopyPlan, SaveOutcome, copy_all, safe_copy};
pub use self::renaming::{RENAMED_DIR, RenamingLayout};

/// 把 (源文件, 名称) 映射为目标路径
pub trait SaveLayout {
  fn plan(&self, entries: &[(PathBuf, String)], output_dir: &Path) -> Vec<CopyPlan>;
}

impl SaveLayout for Mode {
  fn plan(&self, entries: &[(PathBuf, String)], output_dir: &Path) -> Vec<CopyPlan> {
    match self {
      Mode::Renaming => RenamingLayout.plan(entries, output_dir),
      Mode::Classification => ClassificationLayout.plan(entries, output_dir),
    }
  }
}

#[derive(Error, Debug)]
pub enum SaveError {
  #[error("没有可保存的数据")]
  NoData,
  #[error("没有有效的照片路径")]
  NoValidPaths,
  #[error("无法创建输出目录: {0}")]
  IoError(#[from] std::io::Error),
}

/// 结果表格中的一行；序号可能被用户编辑成任意值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
  pub number: Value,
  #[serde(default)]
  pub name: String,
}

impl TableRow {
  pub fn new(number: usize, name: impl Into<String>) -> Self {
    Self {
      number: Value::from(number),
      name: name.into(),
    }
  }

  /// 序号按整数解析，无法解析时为 0
  pub fn parsed_number(&self) -> i64 {
    match &self.number {
      Value::Number(number) => number
        .as_i64()
        .or_else(|| number.as_f64().map(|value| value as i64))
        .unwrap_or(0),
      Value::String(text) => {
        let text = text.trim();
        text
          .parse::<i64>()
          .ok()
          .or_else(|| text.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
          .unwrap_or(0)
      }
      _ => 0,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveSummary {
  pub saved: usize,
  pub failed: usize,
  pub outcomes: Vec<SaveOutcome>,
}

/// 去掉首尾空白，并替换路径分隔符与常见文件系统的保留字符
pub fn sanitize_name(name: &str) -> String {
  let cleaned: String = name
    .trim()
    .chars()
    .map(|c| match c {
      '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
      c if c.is_control() => '_',
      c => c,
    })
    .collect();
  let cleaned = cleaned.trim();
  match cleaned {
    "" | "." | ".." => "_".to_string(),
    other => other.to_string(),
  }
}

/// 名称为空时的默认名称
pub fn default_name(prefix: &str, number: i64) -> String {
  if prefix.is_empty() {
    number.to_string()
  } else {
    format!("{}_{}", prefix, number)
  }
}

/// 按（可能被编辑过的）结果表格保存照片
pub fn save_processing_results(
  rows: &[TableRow],
  photos: &[PathBuf],
  output_dir: &Path,
  mode: Mode,
) -> Result<SaveSummary, SaveError> {
  info!("开始保存结果: {} 行, {} 张照片", rows.len(), photos.len());
  if photos.is_empty() || rows.is_empty() {
    warn!("没有可保存的数据");
    return Err(SaveError::NoData);
  }

  let mut entries = Vec::with_capacity(rows.len());
  let mut invalid = 0;
  for row in rows {
    let number = row.parsed_number();
    let Some(index) = number
      .checked_sub(1)
      .and_then(|index| usize::try_from(index).ok())
      .filter(|index| *index < photos.len())
    else {
      invalid += 1;
      continue;
    };
    let name = row.name.trim();
    let name = if name.is_empty() {
      default_name(mode.default_prefix(), number)
    } else {
      name.to_string()
    };
    debug!("第 {} 张照片 -> {}", number, name);
    entries.push((photos[index].clone(), name));
  }
  if invalid > 0 {
    warn!("忽略 {} 个无效序号", invalid);
  }
  if entries.is_empty() {
    warn!("没有有效的照片路径");
    return Err(SaveError::NoValidPaths);
  }

  fs::create_dir_all(output_dir)?;
  let plans = mode.plan(&entries, output_dir);
  info!("保存 {} 个文件到 {}", plans.len(), output_dir.display());
  let outcomes = copy_all(&plans);

  let saved = outcomes.iter().filter(|outcome| outcome.is_saved()).count();
  let failed = outcomes.len() - saved;
  info!("保存结果: 成功 {}，失败 {}", saved, failed);
  if failed > 0 {
    let examples: Vec<String> = outcomes
      .iter()
      .filter(|outcome| !outcome.is_saved())
      .take(3)
      .map(|outcome| outcome.to_string())
      .collect();
    warn!("保存失败示例: {:?}", examples);
  }

  Ok(SaveSummary {
    saved,
    failed,
    outcomes,
  })
}
