// 该文件是 Zhaopian （照片） 项目的一部分。
// src/output/classification.rs - 分类保存布局
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

use crate::frame::display_name;

use super::{CopyPlan, SaveLayout, sanitize_name};

pub const CLASSIFIED_DIR: &str = "classified_photos";

/// 按类别分目录保存，保留原文件名
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationLayout;

impl SaveLayout for ClassificationLayout {
  fn plan(&self, entries: &[(PathBuf, String)], output_dir: &Path) -> Vec<CopyPlan> {
    let root = output_dir.join(CLASSIFIED_DIR);
    entries
      .iter()
      .map(|(src, class)| CopyPlan {
        src: src.clone(),
        dest: root.join(sanitize_name(class)).join(display_name(src)),
      })
      .collect()
  }
}
