// 该文件是 Zhaopian （照片） 项目的一部分。
// src/studio/worker.rs - 模型线程
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
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use tracing::{error, info};

use crate::frame::PhotoFrame;
use crate::handler::{HandlerError, HubPipeline, Labelled, Mode, PipelineFactory};
use crate::input::{ImageFileInput, PhotoInput};
use crate::model::Model;
use crate::task::{BatchTask, Report, Task, TaskEvent};

use super::state::{NoticeLevel, StudioState, TabReport};

/// 一次批处理请求
#[derive(Debug, Clone)]
pub struct ProcessJob {
  pub mode: Mode,
  pub photos: Vec<PathBuf>,
  pub label_model: String,
  pub translation_model: String,
  pub language: String,
}

#[derive(Debug)]
pub enum WorkerJob {
  Process(ProcessJob),
  Shutdown,
}

/// 根据请求构建处理流程
pub trait PipelineSource: Send + 'static {
  type Pipeline: Model<Input = PhotoFrame, Output = Labelled, Error = Self::Error>;
  type Error: Display;

  fn pipeline(&mut self, job: &ProcessJob) -> Result<Self::Pipeline, HandlerError>;
}

impl PipelineSource for PipelineFactory {
  type Pipeline = HubPipeline;
  type Error = crate::model::HubError;

  fn pipeline(&mut self, job: &ProcessJob) -> Result<Self::Pipeline, HandlerError> {
    self.build(job.mode, &job.label_model, &job.translation_model, &job.language)
  }
}

/// 启动模型线程；阻塞的推理客户端只在该线程中使用
pub fn spawn_worker<S: PipelineSource>(
  mut source: S,
  jobs: Receiver<WorkerJob>,
  state: StudioState,
) -> std::io::Result<JoinHandle<()>> {
  thread::Builder::new()
    .name("model-worker".to_string())
    .spawn(move || {
      info!("模型线程已启动");
      for job in jobs {
        match job {
          WorkerJob::Process(job) => run_job(&mut source, job, &state),
          WorkerJob::Shutdown => break,
        }
      }
      info!("模型线程退出");
    })
}

fn run_job<S: PipelineSource>(source: &mut S, job: ProcessJob, state: &StudioState) {
  let mode = job.mode;
  let report = TabReport {
    state: state.clone(),
    mode,
  };
  if state.processing().is_cancelled() {
    info!("[{}] 任务在排队时已取消，跳过", mode);
    report.report(&TaskEvent::Cancelled { processed: 0 });
    state.finish(mode, None);
    return;
  }

  let pipeline = match source.pipeline(&job) {
    Ok(pipeline) => pipeline,
    Err(err) => {
      error!("[{}] 无法构建处理流程: {}", mode, err);
      state.notify(mode, NoticeLevel::Warning, format!("Processing error: {}", err));
      state.finish(mode, None);
      return;
    }
  };

  let input = PhotoInput::new(job.photos, ImageFileInput::new().with_max_side(mode.max_side()));
  match BatchTask::new(state.processing().clone()).run_task(input, pipeline, report) {
    Ok(results) => state.finish(mode, Some(&results)),
    Err(err) => {
      error!("[{}] 批处理失败: {}", mode, err);
      state.notify(mode, NoticeLevel::Warning, format!("Processing error: {}", err));
      state.finish(mode, None);
    }
  }
}
