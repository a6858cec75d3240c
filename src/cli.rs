// 该文件是 Zhaopian （照片） 项目的一部分。
// src/cli.rs - 命令行批处理流程
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

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::args::{BatchArgs, ModelArgs};
use crate::handler::{Mode, PipelineFactory};
use crate::input::{ImageFileInput, PhotoInput};
use crate::output::{SaveSummary, save_processing_results};
use crate::task::{BatchResults, BatchTask, LogReport, ProcessingState, Task};
use crate::utils;

/// 收到中断信号后强制退出前的等待时间
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

/// 收集照片、运行批处理、打印结果并保存
pub fn run_batch(
  mode: Mode,
  mut factory: PipelineFactory,
  model: &ModelArgs,
  batch: &BatchArgs,
) -> Result<()> {
  info!("输出目录: {}", batch.output_dir.display());

  let photos = utils::collect_images(&batch.inputs);
  if photos.is_empty() {
    anyhow::bail!("没有找到照片");
  }

  let pipeline = factory.build(
    mode,
    model.label_model(mode),
    &model.translation_model,
    &model.language,
  )?;

  let state = ProcessingState::new();
  let cancel = state.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，跳过剩余照片...");
    cancel.cancel();
    thread::spawn(|| {
      thread::sleep(FORCE_EXIT_AFTER);
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  let input = PhotoInput::new(photos.clone(), ImageFileInput::new().with_max_side(mode.max_side()));
  let results = BatchTask::new(state).run_task(input, pipeline, LogReport)?;

  print_rows(&results);
  if mode == Mode::Classification {
    for (class, count) in class_counts(&results) {
      info!("类别 {}: {} 张", class, count);
    }
  }
  if batch.dry_run {
    return Ok(());
  }

  let summary = save_processing_results(&results.save_rows(), &photos, &batch.output_dir, mode)?;
  print_summary(&summary);
  Ok(())
}

fn print_rows(results: &BatchResults) {
  for row in results.report_rows() {
    println!("{}\t{}", row.number, row.name);
  }
}

fn print_summary(summary: &SaveSummary) {
  println!("已保存 {} 个文件，失败 {} 个", summary.saved, summary.failed);
  for outcome in summary.outcomes.iter().filter(|outcome| !outcome.is_saved()) {
    println!("  {}", outcome);
  }
}

/// 每个类别的照片数，按类别名排序
fn class_counts(results: &BatchResults) -> BTreeMap<String, usize> {
  let mut classes = BTreeMap::new();
  for row in results.report_rows() {
    *classes.entry(row.name).or_default() += 1;
  }
  classes
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::handler::Labelled;
  use crate::task::ItemResult;

  fn labelled(translated: &str) -> Option<ItemResult> {
    Some(ItemResult::Labelled(Labelled {
      original: translated.to_string(),
      translated: translated.to_string(),
    }))
  }

  #[test]
  fn classes_are_counted_per_name() {
    let results = BatchResults {
      items: vec![labelled("кошка"), None, labelled("собака"), labelled("кошка")],
      cancelled: true,
    };
    let counts = class_counts(&results);
    assert_eq!(counts.len(), 2);
    assert_eq!(counts["кошка"], 2);
    assert_eq!(counts["собака"], 1);
  }
}
