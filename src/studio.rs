// 该文件是 Zhaopian （照片） 项目的一部分。
// src/studio.rs - 双标签页网页界面
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

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::handler::Mode;
use crate::output::SaveError;

mod handlers;
mod routes;
mod state;
mod worker;

pub use self::routes::router;
pub use self::state::{
  Notice, NoticeLevel, PhotoEntry, StudioConfig, StudioState, TabReport, TabSnapshot, TabState,
};
pub use self::worker::{PipelineSource, ProcessJob, WorkerJob, spawn_worker};

pub const INDEX_HTML: &str = include_str!("studio/index.html");

#[derive(Error, Debug)]
pub enum StudioError {
  #[error("{0} 标签页正在处理中")]
  Busy(Mode),
  #[error("没有上传照片")]
  NoPhotos,
  #[error("照片 {0} 不存在")]
  PhotoNotFound(usize),
  #[error("照片数据无效: {0}")]
  InvalidUpload(#[from] base64::DecodeError),
  #[error("文件读写错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("保存失败: {0}")]
  SaveError(#[from] SaveError),
  #[error("模型线程不可用")]
  WorkerGone,
  #[error("后台任务失败: {0}")]
  JoinError(#[from] tokio::task::JoinError),
}

impl StudioError {
  fn status(&self) -> StatusCode {
    match self {
      StudioError::Busy(_) => StatusCode::CONFLICT,
      StudioError::NoPhotos | StudioError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
      StudioError::SaveError(SaveError::NoData | SaveError::NoValidPaths) => StatusCode::BAD_REQUEST,
      StudioError::PhotoNotFound(_) => StatusCode::NOT_FOUND,
      StudioError::WorkerGone => StatusCode::SERVICE_UNAVAILABLE,
      StudioError::IoError(_) | StudioError::SaveError(_) | StudioError::JoinError(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

#[derive(Serialize)]
struct ApiError {
  error: String,
}

impl IntoResponse for StudioError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("请求失败: {}", self);
    } else {
      tracing::warn!("请求被拒绝: {}", self);
    }
    (
      status,
      Json(ApiError {
        error: self.to_string(),
      }),
    )
      .into_response()
  }
}
