// 该文件是 Zhaopian （照片） 项目的一部分。
// src/studio/handlers.rs - 接口处理函数
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

use std::io::ErrorKind;
use std::path::PathBuf;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::handler::Mode;
use crate::model::registry::{
  CAPTION_MODELS, DEFAULT_CAPTION_MODEL, DEFAULT_DETECTION_MODEL, DEFAULT_TRANSLATION_MODEL,
  DETECTION_MODELS, TRANSLATION_MODELS,
};
use crate::model::language::DEFAULT_LANGUAGE;
use crate::model::{Language, ModelEntry};
use crate::output::{SaveError, SaveSummary, TableRow, sanitize_name, save_processing_results};
use crate::utils::{clear_temp_dir, collect_images};

use super::state::{NoticeLevel, StudioState, TabSnapshot};
use super::worker::{ProcessJob, WorkerJob};
use super::{INDEX_HTML, StudioError};

type ApiResult<T> = Result<Json<T>, StudioError>;

pub async fn index() -> Html<&'static str> {
  Html(INDEX_HTML)
}

#[derive(Serialize)]
pub struct Defaults {
  caption_model: &'static str,
  detection_model: &'static str,
  translation_model: &'static str,
  language: &'static str,
}

#[derive(Serialize)]
pub struct Options {
  caption_models: &'static [ModelEntry],
  detection_models: &'static [ModelEntry],
  translation_models: &'static [ModelEntry],
  languages: Vec<Language>,
  defaults: Defaults,
  output_dir: String,
}

pub async fn options(State(state): State<StudioState>) -> Json<Options> {
  Json(Options {
    caption_models: CAPTION_MODELS,
    detection_models: DETECTION_MODELS,
    translation_models: TRANSLATION_MODELS,
    languages: Language::all().collect(),
    defaults: Defaults {
      caption_model: DEFAULT_CAPTION_MODEL,
      detection_model: DEFAULT_DETECTION_MODEL,
      translation_model: DEFAULT_TRANSLATION_MODEL,
      language: DEFAULT_LANGUAGE,
    },
    output_dir: state.config().output_dir.display().to_string(),
  })
}

pub async fn snapshot(State(state): State<StudioState>, Path(mode): Path<Mode>) -> Json<TabSnapshot> {
  Json(state.snapshot(mode))
}

#[derive(Deserialize)]
pub struct UploadedPhoto {
  pub name: String,
  /// base64，可带 data URL 前缀
  pub data: String,
}

#[derive(Deserialize)]
pub struct UploadRequest {
  pub photos: Vec<UploadedPhoto>,
}

fn decode_upload(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
  let payload = match data.split_once(";base64,") {
    Some((_, payload)) => payload,
    None => data,
  };
  STANDARD.decode(payload.trim())
}

pub async fn upload_photos(
  State(state): State<StudioState>,
  Path(mode): Path<Mode>,
  Json(request): Json<UploadRequest>,
) -> ApiResult<TabSnapshot> {
  state.with_idle_tab(mode, |_| ())?;
  let decoded = request
    .photos
    .iter()
    .map(|photo| -> Result<_, StudioError> {
      Ok((sanitize_name(&photo.name), decode_upload(&photo.data)?))
    })
    .collect::<Result<Vec<_>, StudioError>>()?;

  let batch = chrono::Local::now().format("%Y%m%d%H%M%S%f").to_string();
  let dir = state.upload_dir(mode).join(batch);
  let mut paths = Vec::with_capacity(decoded.len());
  for (position, (name, bytes)) in decoded.into_iter().enumerate() {
    let photo_dir = dir.join(position.to_string());
    tokio::fs::create_dir_all(&photo_dir).await?;
    let path = photo_dir.join(name);
    tokio::fs::write(&path, bytes).await?;
    paths.push(path);
  }

  let total = state.add_photos(mode, paths)?;
  info!("[{}] 上传完成，共 {} 张照片", mode, total);
  Ok(Json(state.snapshot(mode)))
}

#[derive(Deserialize)]
pub struct PathsRequest {
  pub paths: Vec<PathBuf>,
}

pub async fn add_paths(
  State(state): State<StudioState>,
  Path(mode): Path<Mode>,
  Json(request): Json<PathsRequest>,
) -> ApiResult<TabSnapshot> {
  state.with_idle_tab(mode, |_| ())?;
  let photos = tokio::task::spawn_blocking(move || collect_images(&request.paths)).await?;
  if photos.is_empty() {
    state.notify(mode, NoticeLevel::Warning, "No images found");
  }
  state.add_photos(mode, photos)?;
  Ok(Json(state.snapshot(mode)))
}

fn content_type(path: &std::path::Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(str::to_ascii_lowercase)
    .unwrap_or_default();
  match ext.as_str() {
    "jpg" | "jpeg" => "image/jpeg",
    "png" => "image/png",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "bmp" => "image/bmp",
    "tif" | "tiff" => "image/tiff",
    _ => "application/octet-stream",
  }
}

pub async fn photo(
  State(state): State<StudioState>,
  Path((mode, index)): Path<(Mode, usize)>,
) -> Result<impl IntoResponse, StudioError> {
  let path = state.photo(mode, index)?;
  let bytes = tokio::fs::read(&path).await.map_err(|err| match err.kind() {
    ErrorKind::NotFound => StudioError::PhotoNotFound(index),
    _ => StudioError::IoError(err),
  })?;
  Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes))
}

#[derive(Deserialize)]
pub struct RowsRequest {
  pub rows: Vec<TableRow>,
}

pub async fn update_rows(
  State(state): State<StudioState>,
  Path(mode): Path<Mode>,
  Json(request): Json<RowsRequest>,
) -> ApiResult<TabSnapshot> {
  state.with_idle_tab(mode, |tab| tab.rows = request.rows)?;
  Ok(Json(state.snapshot(mode)))
}

#[derive(Deserialize, Default)]
pub struct ProcessRequest {
  #[serde(default)]
  pub label_model: Option<String>,
  #[serde(default)]
  pub translation_model: Option<String>,
  #[serde(default)]
  pub language: Option<String>,
}

pub async fn process(
  State(state): State<StudioState>,
  Path(mode): Path<Mode>,
  Json(request): Json<ProcessRequest>,
) -> Result<(StatusCode, Json<TabSnapshot>), StudioError> {
  let photos = state.with_idle_tab(mode, |tab| tab.photos.clone())?;
  if photos.is_empty() {
    state.with_tab(mode, |tab| tab.rows.clear());
    state.notify(mode, NoticeLevel::Warning, "No images uploaded for processing");
    return Err(StudioError::NoPhotos);
  }

  let job = ProcessJob {
    mode,
    photos,
    label_model: request
      .label_model
      .unwrap_or_else(|| mode.default_label_model().to_string()),
    translation_model: request
      .translation_model
      .unwrap_or_else(|| DEFAULT_TRANSLATION_MODEL.to_string()),
    language: request
      .language
      .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
  };
  info!(
    "[{}] 提交任务: {} 张照片 | 模型: {}/{} | 语言: {}",
    mode,
    job.photos.len(),
    job.label_model,
    job.translation_model,
    job.language
  );
  state.submit(mode, WorkerJob::Process(job))?;
  Ok((StatusCode::ACCEPTED, Json(state.snapshot(mode))))
}

pub async fn cancel(State(state): State<StudioState>) -> Json<Value> {
  let running = state.any_running();
  state.processing().cancel();
  Json(json!({ "cancelled": running }))
}

#[derive(Deserialize, Default)]
pub struct SaveRequest {
  #[serde(default)]
  pub rows: Option<Vec<TableRow>>,
  #[serde(default)]
  pub output_dir: Option<String>,
}

pub async fn save(
  State(state): State<StudioState>,
  Path(mode): Path<Mode>,
  Json(request): Json<SaveRequest>,
) -> ApiResult<SaveSummary> {
  let (rows, photos) = state.with_idle_tab(mode, |tab| {
    if let Some(rows) = request.rows {
      tab.rows = rows;
    }
    (tab.rows.clone(), tab.photos.clone())
  })?;
  let output_dir = state.resolve_output_dir(request.output_dir.as_deref());

  let result =
    tokio::task::spawn_blocking(move || save_processing_results(&rows, &photos, &output_dir, mode))
      .await?;
  match result {
    Ok(summary) => {
      if summary.failed == 0 {
        state.notify(
          mode,
          NoticeLevel::Info,
          format!("Successfully saved {} files", summary.saved),
        );
      } else {
        state.notify(
          mode,
          NoticeLevel::Warning,
          format!("Saved {} files with {} errors", summary.saved, summary.failed),
        );
      }
      Ok(Json(summary))
    }
    Err(err) => {
      let message = match &err {
        SaveError::NoData => "No data to save",
        SaveError::NoValidPaths => "No valid image paths found",
        SaveError::IoError(_) => "File saving error",
      };
      state.notify(mode, NoticeLevel::Warning, message);
      Err(err.into())
    }
  }
}

pub async fn reset(State(state): State<StudioState>, Path(mode): Path<Mode>) -> ApiResult<TabSnapshot> {
  state.reset(mode)?;
  state.notify(mode, NoticeLevel::Info, "Components reset");
  Ok(Json(state.snapshot(mode)))
}

pub async fn clear_temp(State(state): State<StudioState>) -> ApiResult<Value> {
  let dir = state.config().upload_dir.clone();
  let removed = tokio::task::spawn_blocking(move || clear_temp_dir(&dir)).await??;
  let forgotten = state.forget_uploads();
  Ok(Json(json!({
    "removed": removed,
    "forgotten": forgotten,
    "message": "Temporary data cleared",
  })))
}
