// 该文件是 Zhaopian （照片） 项目的一部分。
// src/task.rs - 批处理任务与取消
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

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::frame::PhotoFrame;
use crate::handler::Labelled;
use crate::input::PhotoSlot;
use crate::model::Model;
use crate::output::TableRow;

/// 可在线程间共享的取消标志
#[derive(Debug, Clone, Default)]
pub struct ProcessingState {
  cancelled: Arc<AtomicBool>,
}

impl ProcessingState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    warn!("收到取消请求");
    self.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn reset(&self) {
    self.cancelled.store(false, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
  Started { total: usize },
  Processing { index: usize, name: String },
  Labelled { index: usize, original: String, translated: String },
  Failed { index: usize, message: String },
  Cancelled { processed: usize },
  Finished { processed: usize },
}

pub trait Report {
  fn report(&self, event: &TaskEvent);
}

impl<F: Fn(&TaskEvent)> Report for F {
  fn report(&self, event: &TaskEvent) {
    self(event)
  }
}

/// 只写日志的进度输出
pub struct LogReport;

impl Report for LogReport {
  fn report(&self, event: &TaskEvent) {
    match event {
      TaskEvent::Started { total } => info!("开始处理 {} 张照片", total),
      TaskEvent::Processing { index, name } => info!("({}) 处理照片: {}", index + 1, name),
      TaskEvent::Labelled {
        index, translated, ..
      } => info!("({}) 完成: {}", index + 1, translated),
      TaskEvent::Failed { index, message } => error!("({}) 失败: {}", index + 1, message),
      TaskEvent::Cancelled { processed } => warn!("任务已取消，已处理 {} 张", processed),
      TaskEvent::Finished { processed } => info!("任务完成，共处理 {} 张", processed),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemResult {
  Labelled(Labelled),
  Failed { message: String },
}

impl ItemResult {
  /// 表格中显示的值：译文或错误信息
  pub fn value(&self) -> &str {
    match self {
      ItemResult::Labelled(labelled) => &labelled.translated,
      ItemResult::Failed { message } => message,
    }
  }
}

/// 按照片索引存放的结果，未处理的位置为 None
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResults {
  pub items: Vec<Option<ItemResult>>,
  pub cancelled: bool,
}

impl BatchResults {
  fn with_len(len: usize) -> Self {
    Self {
      items: vec![None; len],
      cancelled: false,
    }
  }

  pub fn processed(&self) -> usize {
    self.items.iter().filter(|item| item.is_some()).count()
  }

  pub fn failed(&self) -> usize {
    self
      .items
      .iter()
      .filter(|item| matches!(item, Some(ItemResult::Failed { .. })))
      .count()
  }

  /// 已处理照片的表格行：(序号 = 索引 + 1, 值)
  pub fn report_rows(&self) -> Vec<TableRow> {
    self
      .items
      .iter()
      .enumerate()
      .filter_map(|(index, item)| {
        item
          .as_ref()
          .map(|item| TableRow::new(index + 1, item.value()))
      })
      .collect()
  }

  /// 直接保存时使用的表格行：失败项名称留空，保存时使用默认名称
  pub fn save_rows(&self) -> Vec<TableRow> {
    self
      .items
      .iter()
      .enumerate()
      .filter_map(|(index, item)| match item {
        Some(ItemResult::Labelled(labelled)) => Some(TableRow::new(index + 1, &labelled.translated)),
        Some(ItemResult::Failed { .. }) => Some(TableRow::new(index + 1, "")),
        None => None,
      })
      .collect()
  }
}

pub trait Task<I, M, R>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, report: R) -> Result<Self::Output, Self::Error>;
}

/// 逐张处理照片；单张失败不影响整批，取消后保留已完成的结果
///
/// 取消标志由调用方在接受任务时清除，运行中不会重置。
pub struct BatchTask {
  state: ProcessingState,
}

impl BatchTask {
  pub fn new(state: ProcessingState) -> Self {
    Self { state }
  }
}

impl<I, M, R> Task<I, M, R> for BatchTask
where
  I: ExactSizeIterator<Item = PhotoSlot>,
  M: Model<Input = PhotoFrame, Output = Labelled>,
  M::Error: Display,
  R: Report,
{
  type Output = BatchResults;
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, report: R) -> Result<Self::Output, Self::Error> {
    let total = input.len();
    let mut results = BatchResults::with_len(total);
    report.report(&TaskEvent::Started { total });

    if total == 0 {
      warn!("没有需要处理的照片");
      report.report(&TaskEvent::Finished { processed: 0 });
      return Ok(results);
    }

    let started = Instant::now();
    for slot in input {
      if self.state.is_cancelled() {
        results.cancelled = true;
        report.report(&TaskEvent::Cancelled {
          processed: results.processed(),
        });
        return Ok(results);
      }
      if slot.index >= total {
        warn!("忽略越界的照片索引: {}", slot.index);
        continue;
      }

      let name = crate::frame::display_name(&slot.path);
      report.report(&TaskEvent::Processing {
        index: slot.index,
        name: name.clone(),
      });

      let now = Instant::now();
      let outcome = match slot.frame {
        Ok(frame) => model.infer(&frame).map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
      };
      debug!("{} 处理耗时: {:.2?}", name, now.elapsed());

      let item = match outcome {
        Ok(labelled) => {
          report.report(&TaskEvent::Labelled {
            index: slot.index,
            original: labelled.original.clone(),
            translated: labelled.translated.clone(),
          });
          ItemResult::Labelled(labelled)
        }
        Err(err) => {
          let message = format!("processing error: {}", err);
          report.report(&TaskEvent::Failed {
            index: slot.index,
            message: message.clone(),
          });
          ItemResult::Failed { message }
        }
      };
      results.items[slot.index] = Some(item);
    }

    let processed = results.processed();
    info!(
      "批处理完成: {}/{} 张，失败 {} 张，耗时 {:.2?}",
      processed,
      total,
      results.failed(),
      started.elapsed()
    );
    report.report(&TaskEvent::Finished { processed });
    Ok(results)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::input::{ImageFileInput, PhotoInput};
  use image::{Rgb, RgbImage};
  use std::path::PathBuf;
  use std::sync::Mutex;

  struct NameLength;

  impl Model for NameLength {
    type Input = PhotoFrame;
    type Output = Labelled;
    type Error = String;

    fn infer(&self, frame: &PhotoFrame) -> Result<Labelled, String> {
      if frame.name.starts_with("bad") {
        return Err("model refused".to_string());
      }
      Ok(Labelled {
        original: frame.name.clone(),
        translated: frame.name.to_uppercase(),
      })
    }
  }

  fn photos(dir: &std::path::Path, names: &[&str]) -> Vec<PathBuf> {
    names
      .iter()
      .map(|name| {
        let path = dir.join(name);
        RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])).save(&path).unwrap();
        path
      })
      .collect()
  }

  #[test]
  fn failures_do_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = photos(dir.path(), &["a.png", "bad.png"]);
    paths.push(dir.path().join("missing.png"));
    let events = Mutex::new(Vec::new());

    let results = BatchTask::new(ProcessingState::new())
      .run_task(
        PhotoInput::new(paths, ImageFileInput::new()),
        NameLength,
        |event: &TaskEvent| events.lock().unwrap().push(event.clone()),
      )
      .unwrap();

    assert_eq!(results.processed(), 3);
    assert_eq!(results.failed(), 2);
    assert!(!results.cancelled);
    let rows = results.report_rows();
    assert_eq!(rows[0], TableRow::new(1, "A.PNG"));
    assert!(rows[1].name.contains("model refused"));
    assert_eq!(results.save_rows()[1], TableRow::new(2, ""));

    let events = events.into_inner().unwrap();
    assert_eq!(events.first(), Some(&TaskEvent::Started { total: 3 }));
    assert_eq!(events.last(), Some(&TaskEvent::Finished { processed: 3 }));
  }

  #[test]
  fn cancellation_keeps_partial_results() {
    let dir = tempfile::tempdir().unwrap();
    let paths = photos(dir.path(), &["a.png", "b.png", "c.png"]);
    let state = ProcessingState::new();
    let cancel = state.clone();

    let results = BatchTask::new(state)
      .run_task(
        PhotoInput::new(paths, ImageFileInput::new()),
        NameLength,
        move |event: &TaskEvent| {
          if let TaskEvent::Labelled { index: 0, .. } = event {
            cancel.cancel();
          }
        },
      )
      .unwrap();

    assert!(results.cancelled);
    assert_eq!(results.processed(), 1);
    assert_eq!(results.report_rows(), vec![TableRow::new(1, "A.PNG")]);
    assert_eq!(results.items.len(), 3);
  }

  #[test]
  fn cancellation_before_start_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let paths = photos(dir.path(), &["a.png", "b.png"]);
    let state = ProcessingState::new();
    state.cancel();

    let results = BatchTask::new(state.clone())
      .run_task(PhotoInput::new(paths, ImageFileInput::new()), NameLength, LogReport)
      .unwrap();
    assert!(results.cancelled);
    assert_eq!(results.processed(), 0);
    assert!(state.is_cancelled());

    state.reset();
    assert!(!state.is_cancelled());
  }

  #[test]
  fn empty_batch_returns_empty_results() {
    let results = BatchTask::new(ProcessingState::new())
      .run_task(PhotoInput::new(Vec::new(), ImageFileInput::new()), NameLength, LogReport)
      .unwrap();
    assert_eq!(results, BatchResults::default());
  }
}
