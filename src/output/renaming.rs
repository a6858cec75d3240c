// 该文件是 Zhaopian （照片） 项目的一部分。
// src/output/renaming.rs - 重命名保存布局
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

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CopyPlan, SaveLayout, sanitize_name};

pub const RENAMED_DIR: &str = "renamed_photos";

/// 以新名称保存；同名时依次加上 " 2"、" 3" …
#[derive(Debug, Clone, Copy, Default)]
pub struct RenamingLayout;

impl SaveLayout for RenamingLayout {
  fn plan(&self, entries: &[(PathBuf, String)], output_dir: &Path) -> Vec<CopyPlan> {
    let dir = if entries.len() > 1 {
      output_dir.join(RENAMED_DIR)
    } else {
      output_dir.to_path_buf()
    };

    let mut counter: HashMap<String, usize> = HashMap::new();
    entries
      .iter()
      .map(|(src, name)| {
        let base = sanitize_name(name);
        let count = counter.entry(base.clone()).or_default();
        *count += 1;
        let stem = if *count > 1 {
          format!("{} {}", base, count)
        } else {
          base
        };
        let file_name = match src.extension() {
          Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
          None => stem,
        };
        CopyPlan {
          src: src.clone(),
          dest: dir.join(file_name),
        }
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(path: &str, name: &str) -> (PathBuf, String) {
    (PathBuf::from(path), name.to_string())
  }

  #[test]
  fn duplicates_get_numbered() {
    let out = Path::new("/out");
    let plans = RenamingLayout.plan(
      &[
        entry("/in/1.jpg", "собака"),
        entry("/in/2.PNG", "собака"),
        entry("/in/3.jpg", "кот"),
        entry("/in/4", "собака "),
      ],
      out,
    );
    let dests: Vec<_> = plans.iter().map(|plan| plan.dest.clone()).collect();
    assert_eq!(
      dests,
      vec![
        out.join("renamed_photos/собака.jpg"),
        out.join("renamed_photos/собака 2.PNG"),
        out.join("renamed_photos/кот.jpg"),
        out.join("renamed_photos/собака 3"),
      ]
    );
  }

  #[test]
  fn single_photo_goes_straight_to_output_dir() {
    let plans = RenamingLayout.plan(&[entry("/in/1.jpeg", "sunset")], Path::new("/out"));
    assert_eq!(plans[0].dest, PathBuf::from("/out/sunset.jpeg"));
  }
}
