// 该文件是 Zhaopian （照片） 项目的一部分。
// src/studio/state.rs - 界面共享状态
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
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::frame::display_name;
use crate::handler::Mode;
use crate::output::TableRow;
use crate::task::{BatchResults, ProcessingState, Report, TaskEvent};

use super::StudioError;
use super::worker::WorkerJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
  Info,
  Warning,
}

/// 界面弹出的提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoEntry {
  pub index: usize,
  pub name: String,
}

/// 单个标签页的状态
#[derive(Debug, Default)]
pub struct TabState {
  pub photos: Vec<PathBuf>,
  pub rows: Vec<TableRow>,
  pub running: bool,
  pub processed: usize,
  pub total: usize,
  pub status: String,
  pub notices: Vec<Notice>,
}

impl TabState {
  fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
    self.notices.push(Notice {
      level,
      message: message.into(),
    });
  }

  /// 每张照片一行空白结果
  fn reset_rows(&mut self) {
    self.rows = (1..=self.photos.len())
      .map(|number| TableRow::new(number, ""))
      .collect();
  }

  fn set_row(&mut self, index: usize, value: &str) {
    let row = TableRow::new(index + 1, value);
    match self
      .rows
      .iter_mut()
      .find(|existing| existing.parsed_number() == (index + 1) as i64)
    {
      Some(existing) => *existing = row,
      None => self.rows.push(row),
    }
  }
}

/// 标签页快照，提示消息在读取后清空
#[derive(Debug, Clone, Serialize)]
pub struct TabSnapshot {
  pub mode: Mode,
  pub column: &'static str,
  pub photos: Vec<PhotoEntry>,
  pub rows: Vec<TableRow>,
  pub running: bool,
  pub processed: usize,
  pub total: usize,
  pub status: String,
  pub notices: Vec<Notice>,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
  pub upload_dir: PathBuf,
  pub output_dir: PathBuf,
}

struct StudioInner {
  config: StudioConfig,
  tabs: Mutex<HashMap<Mode, TabState>>,
  processing: ProcessingState,
  jobs: Mutex<Sender<WorkerJob>>,
}

/// 所有请求共享的状态；两个标签页共用一个取消标志
#[derive(Clone)]
pub struct StudioState {
  inner: Arc<StudioInner>,
}

impl StudioState {
  pub fn new(config: StudioConfig, jobs: Sender<WorkerJob>) -> Self {
    let tabs = Mode::ALL
      .into_iter()
      .map(|mode| (mode, TabState::default()))
      .collect();
    Self {
      inner: Arc::new(StudioInner {
        config,
        tabs: Mutex::new(tabs),
        processing: ProcessingState::new(),
        jobs: Mutex::new(jobs),
      }),
    }
  }

  pub fn config(&self) -> &StudioConfig {
    &self.inner.config
  }

  pub fn processing(&self) -> &ProcessingState {
    &self.inner.processing
  }

  fn tabs(&self) -> MutexGuard<'_, HashMap<Mode, TabState>> {
    self.inner.tabs.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// 在锁内修改某个标签页
  pub fn with_tab<R>(&self, mode: Mode, f: impl FnOnce(&mut TabState) -> R) -> R {
    let mut tabs = self.tabs();
    f(tabs.entry(mode).or_default())
  }

  /// 标签页空闲时才执行修改
  pub fn with_idle_tab<R>(
    &self,
    mode: Mode,
    f: impl FnOnce(&mut TabState) -> R,
  ) -> Result<R, StudioError> {
    self.with_tab(mode, |tab| {
      if tab.running {
        Err(StudioError::Busy(mode))
      } else {
        Ok(f(tab))
      }
    })
  }

  pub fn any_running(&self) -> bool {
    self.tabs().values().any(|tab| tab.running)
  }

  pub fn snapshot(&self, mode: Mode) -> TabSnapshot {
    self.with_tab(mode, |tab| TabSnapshot {
      mode,
      column: mode.column_name(),
      photos: tab
        .photos
        .iter()
        .enumerate()
        .map(|(index, path)| PhotoEntry {
          index,
          name: display_name(path),
        })
        .collect(),
      rows: tab.rows.clone(),
      running: tab.running,
      processed: tab.processed,
      total: tab.total,
      status: tab.status.clone(),
      notices: std::mem::take(&mut tab.notices),
    })
  }

  pub fn notify(&self, mode: Mode, level: NoticeLevel, message: impl Into<String>) {
    let message = message.into();
    match level {
      NoticeLevel::Info => info!("[{}] {}", mode, message),
      NoticeLevel::Warning => warn!("[{}] {}", mode, message),
    }
    self.with_tab(mode, |tab| tab.notify(level, message));
  }

  /// 追加照片，并把结果表格重置为每张照片一行
  pub fn add_photos(&self, mode: Mode, photos: Vec<PathBuf>) -> Result<usize, StudioError> {
    self.with_idle_tab(mode, |tab| {
      tab.photos.extend(photos);
      tab.reset_rows();
      tab.processed = 0;
      tab.total = 0;
      tab.status.clear();
      tab.photos.len()
    })
  }

  pub fn photo(&self, mode: Mode, index: usize) -> Result<PathBuf, StudioError> {
    self.with_tab(mode, |tab| tab.photos.get(index).cloned())
      .ok_or(StudioError::PhotoNotFound(index))
  }

  pub fn reset(&self, mode: Mode) -> Result<(), StudioError> {
    self.with_idle_tab(mode, |tab| {
      tab.photos.clear();
      tab.rows.clear();
      tab.processed = 0;
      tab.total = 0;
      tab.status.clear();
    })
  }

  /// 临时目录被清理后，移除空闲标签页中指向上传文件的照片
  pub fn forget_uploads(&self) -> usize {
    let upload_dir = self.inner.config.upload_dir.clone();
    let mut tabs = self.tabs();
    let mut forgotten = 0;
    for tab in tabs.values_mut().filter(|tab| !tab.running) {
      let before = tab.photos.len();
      tab.photos.retain(|path| !path.starts_with(&upload_dir));
      if tab.photos.len() != before {
        forgotten += before - tab.photos.len();
        tab.reset_rows();
      }
    }
    forgotten
  }

  /// 标记为运行中并把任务交给模型线程
  ///
  /// 只有两个标签页都空闲时才清除取消标志，排队中的任务同样响应取消。
  pub fn submit(&self, mode: Mode, job: WorkerJob) -> Result<(), StudioError> {
    {
      let mut tabs = self.tabs();
      let idle = !tabs.values().any(|tab| tab.running);
      let tab = tabs.entry(mode).or_default();
      if tab.running {
        return Err(StudioError::Busy(mode));
      }
      if idle {
        self.inner.processing.reset();
      }
      tab.running = true;
      tab.rows.clear();
      tab.processed = 0;
      tab.total = tab.photos.len();
      tab.status = "Queued".to_string();
    }

    let sent = self
      .inner
      .jobs
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .send(job);
    if sent.is_err() {
      self.with_tab(mode, |tab| {
        tab.running = false;
        tab.status.clear();
      });
      return Err(StudioError::WorkerGone);
    }
    Ok(())
  }

  /// 取消当前和排队中的任务，然后让模型线程退出
  pub fn shutdown_worker(&self) {
    self.inner.processing.cancel();
    let _ = self
      .inner
      .jobs
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .send(WorkerJob::Shutdown);
  }

  /// 任务结束（完成、取消或失败）后更新表格
  pub fn finish(&self, mode: Mode, results: Option<&BatchResults>) {
    self.with_tab(mode, |tab| {
      tab.running = false;
      if let Some(results) = results {
        tab.rows = results.report_rows();
        tab.processed = results.processed();
      }
    });
  }

  pub fn upload_dir(&self, mode: Mode) -> PathBuf {
    self.inner.config.upload_dir.join(mode.as_str())
  }

  pub fn resolve_output_dir(&self, requested: Option<&str>) -> PathBuf {
    match requested.map(str::trim).filter(|dir| !dir.is_empty()) {
      Some(dir) => Path::new(dir).to_path_buf(),
      None => self.inner.config.output_dir.clone(),
    }
  }
}

/// 把任务事件写入对应标签页
pub struct TabReport {
  pub state: StudioState,
  pub mode: Mode,
}

impl Report for TabReport {
  fn report(&self, event: &TaskEvent) {
    debug!("[{}] {:?}", self.mode, event);
    match event {
      TaskEvent::Started { total } => {
        let message = match self.mode {
          Mode::Renaming => "Renaming started",
          Mode::Classification => "Classification started",
        };
        self.state.with_tab(self.mode, |tab| {
          tab.total = *total;
          tab.status = message.to_string();
          tab.notify(NoticeLevel::Info, message);
        });
      }
      TaskEvent::Processing { index, name } => self.state.with_tab(self.mode, |tab| {
        tab.status = format!("Processing {} ({}/{})", name, index + 1, tab.total);
      }),
      TaskEvent::Labelled {
        index, translated, ..
      } => self.state.with_tab(self.mode, |tab| {
        tab.set_row(*index, translated);
        tab.processed += 1;
      }),
      TaskEvent::Failed { index, message } => self.state.with_tab(self.mode, |tab| {
        tab.set_row(*index, message);
        tab.processed += 1;
      }),
      TaskEvent::Cancelled { processed } => {
        self.state.with_tab(self.mode, |tab| {
          tab.status = format!("Cancelled after {} photos", processed);
        });
        self
          .state
          .notify(self.mode, NoticeLevel::Warning, "Operation cancelled by user");
      }
      TaskEvent::Finished { processed } => {
        let message = match self.mode {
          Mode::Renaming => "Renaming completed successfully!",
          Mode::Classification => "Classification completed successfully!",
        };
        self.state.with_tab(self.mode, |tab| {
          tab.status = format!("Completed: {} photos", processed);
        });
        self.state.notify(self.mode, NoticeLevel::Info, message);
      }
    }
  }
}
