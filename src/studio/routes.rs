// 该文件是 Zhaopian （照片） 项目的一部分。
// src/studio/routes.rs - 接口路由
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

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::StudioState;

/// 上传的照片以 base64 放在 JSON 中
const MAX_BODY_SIZE: usize = 512 * 1024 * 1024;

pub fn router(state: StudioState) -> Router {
  Router::new()
    .route("/", get(handlers::index))
    .route("/api/options", get(handlers::options))
    .route("/api/cancel", post(handlers::cancel))
    .route("/api/clear-temp", post(handlers::clear_temp))
    .route("/api/{tab}", get(handlers::snapshot))
    .route("/api/{tab}/photos", post(handlers::upload_photos))
    .route("/api/{tab}/photos/{index}", get(handlers::photo))
    .route("/api/{tab}/paths", post(handlers::add_paths))
    .route("/api/{tab}/rows", put(handlers::update_rows))
    .route("/api/{tab}/process", post(handlers::process))
    .route("/api/{tab}/save", post(handlers::save))
    .route("/api/{tab}/reset", post(handlers::reset))
    .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use std::path::Path;
  use std::sync::mpsc;
  use std::time::Duration;

  use axum::body::Body;
  use axum::http::{Method, Request, StatusCode};
  use base64::Engine;
  use base64::engine::general_purpose::STANDARD;
  use image::{Rgb, RgbImage};
  use serde_json::{Value, json};
  use tower::ServiceExt;

  use super::*;
  use crate::frame::PhotoFrame;
  use crate::handler::{HandlerError, Labelled};
  use crate::model::{Language, Model};
  use crate::studio::{PipelineSource, ProcessJob, StudioConfig, WorkerJob, spawn_worker};

  /// 以文件名作为标签的假模型
  struct FileNameLabel {
    target: Language,
    delay: Duration,
  }

  impl Model for FileNameLabel {
    type Input = PhotoFrame;
    type Output = Labelled;
    type Error = String;

    fn infer(&self, frame: &PhotoFrame) -> Result<Labelled, String> {
      std::thread::sleep(self.delay);
      let stem = frame.name.split('.').next().unwrap_or_default().to_string();
      Ok(Labelled {
        translated: format!("{}-{}", stem, self.target.code),
        original: stem,
      })
    }
  }

  #[derive(Default)]
  struct FakeSource {
    delay: Duration,
  }

  impl PipelineSource for FakeSource {
    type Pipeline = FileNameLabel;
    type Error = String;

    fn pipeline(&mut self, job: &ProcessJob) -> Result<FileNameLabel, HandlerError> {
      Ok(FileNameLabel {
        target: Language::from_name(&job.language)?,
        delay: self.delay,
      })
    }
  }

  struct Harness {
    app: Router,
    state: StudioState,
    _dir: tempfile::TempDir,
    root: std::path::PathBuf,
    worker: Option<std::thread::JoinHandle<()>>,
  }

  fn harness(with_worker: bool) -> (Harness, Option<mpsc::Receiver<WorkerJob>>) {
    harness_with(with_worker.then(FakeSource::default))
  }

  fn harness_with(source: Option<FakeSource>) -> (Harness, Option<mpsc::Receiver<WorkerJob>>) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let (tx, rx) = mpsc::channel();
    let state = StudioState::new(
      StudioConfig {
        upload_dir: root.join("uploads"),
        output_dir: root.join("results"),
      },
      tx,
    );
    let (worker, idle) = match source {
      Some(source) => (Some(spawn_worker(source, rx, state.clone()).unwrap()), None),
      None => (None, Some(rx)),
    };
    (
      Harness {
        app: router(state.clone()),
        state,
        _dir: dir,
        root,
        worker,
      },
      idle,
    )
  }

  impl Harness {
    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
      let request = Request::builder().method(method).uri(uri);
      let request = match body {
        Some(body) => request
          .header("content-type", "application/json")
          .body(Body::from(body.to_string()))
          .unwrap(),
        None => request.body(Body::empty()).unwrap(),
      };
      let response = self.app.clone().oneshot(request).await.unwrap();
      let status = response.status();
      let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
      let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
      (status, value)
    }

    fn photos(&self, names: &[&str]) -> std::path::PathBuf {
      let dir = self.root.join("photos");
      std::fs::create_dir_all(&dir).unwrap();
      for name in names {
        RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]))
          .save(dir.join(name))
          .unwrap();
      }
      dir
    }

    /// 两个标签页载入同一组照片并依次提交
    async fn queue_both(&self, count: usize) {
      let names: Vec<String> = (0..count).map(|i| format!("p{}.png", i)).collect();
      let names: Vec<&str> = names.iter().map(String::as_str).collect();
      let dir = self.photos(&names);
      for tab in ["renaming", "classification"] {
        self
          .call(Method::POST, &format!("/api/{}/paths", tab), Some(json!({ "paths": [dir] })))
          .await;
        let (status, _) = self
          .call(Method::POST, &format!("/api/{}/process", tab), Some(json!({})))
          .await;
        assert_eq!(status, StatusCode::ACCEPTED);
      }
    }

    async fn wait_idle(&self, tab: &str) -> Value {
      for _ in 0..100 {
        let (_, snapshot) = self.call(Method::GET, &format!("/api/{}", tab), None).await;
        if snapshot["running"] == false {
          return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
      }
      panic!("batch did not finish");
    }
  }

  #[tokio::test]
  async fn options_list_models_and_languages() {
    let (h, _idle) = harness(false);
    let (status, options) = h.call(Method::GET, "/api/options", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options["languages"].as_array().unwrap().len(), 52);
    assert_eq!(options["defaults"]["language"], "Russian");
    assert_eq!(options["caption_models"][0]["name"], "git-base-coco");
  }

  #[tokio::test]
  async fn unknown_tab_is_rejected() {
    let (h, _idle) = harness(false);
    let (status, _) = h.call(Method::GET, "/api/sorting", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn process_and_save_round_trip() {
    let (h, _) = harness(true);
    let dir = h.photos(&["cat.png", "dog.png"]);

    let (status, snapshot) = h
      .call(Method::POST, "/api/renaming/paths", Some(json!({ "paths": [dir] })))
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["photos"].as_array().unwrap().len(), 2);
    assert_eq!(snapshot["rows"][1], json!({ "number": 2, "name": "" }));

    let (status, _) = h
      .call(Method::POST, "/api/renaming/process", Some(json!({ "language": "German" })))
      .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let snapshot = h.wait_idle("renaming").await;
    assert_eq!(snapshot["rows"][0]["name"], "cat-de_DE");
    assert_eq!(snapshot["rows"][1]["name"], "dog-de_DE");
    assert_eq!(snapshot["processed"], 2);

    let out = h.root.join("saved");
    let (status, summary) = h
      .call(
        Method::POST,
        "/api/renaming/save",
        Some(json!({
          "rows": [{ "number": "1", "name": "кошка" }, { "number": 2, "name": "" }],
          "output_dir": out,
        })),
      )
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["saved"], 2);
    assert!(out.join("renamed_photos/кошка.png").is_file());
    assert!(out.join("renamed_photos/2.png").is_file());

    let (_, snapshot) = h.call(Method::GET, "/api/renaming", None).await;
    assert_eq!(snapshot["notices"][0]["message"], "Successfully saved 2 files");
  }

  #[tokio::test]
  async fn running_tab_refuses_second_batch() {
    let (h, _idle) = harness(false);
    let dir = h.photos(&["a.png"]);
    h.call(Method::POST, "/api/classification/paths", Some(json!({ "paths": [dir] })))
      .await;

    let (status, snapshot) = h
      .call(Method::POST, "/api/classification/process", Some(json!({})))
      .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(snapshot["running"], true);

    let (status, _) = h
      .call(Method::POST, "/api/classification/process", Some(json!({})))
      .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = h.call(Method::POST, "/api/classification/reset", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, cancelled) = h.call(Method::POST, "/api/cancel", None).await;
    assert_eq!(cancelled["cancelled"], true);
    assert!(h.state.processing().is_cancelled());
  }

  #[tokio::test]
  async fn cancel_reaches_queued_batch() {
    let (h, _) = harness_with(Some(FakeSource {
      delay: Duration::from_millis(100),
    }));
    h.queue_both(10).await;

    tokio::time::sleep(Duration::from_millis(250)).await;
    let (_, cancelled) = h.call(Method::POST, "/api/cancel", None).await;
    assert_eq!(cancelled["cancelled"], true);

    let renaming = h.wait_idle("renaming").await;
    assert!(renaming["processed"].as_u64().unwrap() < 10);
    let classification = h.wait_idle("classification").await;
    assert_eq!(classification["processed"], 0);
    assert_eq!(classification["status"], "Cancelled after 0 photos");

    // 两个标签页都空闲后，新的批处理不受上一次取消影响
    let (status, _) = h
      .call(Method::POST, "/api/classification/process", Some(json!({})))
      .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(!h.state.processing().is_cancelled());
    let classification = h.wait_idle("classification").await;
    assert_eq!(classification["processed"], 10);
  }

  #[tokio::test]
  async fn shutdown_skips_queued_batches() {
    let (mut h, _) = harness_with(Some(FakeSource {
      delay: Duration::from_millis(50),
    }));
    h.queue_both(5).await;

    h.state.shutdown_worker();
    let worker = h.worker.take().unwrap();
    tokio::task::spawn_blocking(move || worker.join())
      .await
      .unwrap()
      .unwrap();

    let (_, renaming) = h.call(Method::GET, "/api/renaming", None).await;
    assert_eq!(renaming["running"], false);
    let (_, classification) = h.call(Method::GET, "/api/classification", None).await;
    assert_eq!(classification["running"], false);
    assert_eq!(classification["processed"], 0);
  }

  #[tokio::test]
  async fn processing_without_photos_warns() {
    let (h, _idle) = harness(false);
    let (status, _) = h
      .call(Method::POST, "/api/renaming/process", Some(json!({})))
      .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, snapshot) = h.call(Method::GET, "/api/renaming", None).await;
    assert_eq!(snapshot["notices"][0]["level"], "warning");
  }

  #[tokio::test]
  async fn uploads_are_served_and_cleared() {
    let (h, _idle) = harness(false);
    let mut png = Vec::new();
    RgbImage::from_pixel(2, 2, Rgb([1, 1, 1]))
      .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
      .unwrap();
    let data = format!("data:image/png;base64,{}", STANDARD.encode(&png));

    let (status, snapshot) = h
      .call(
        Method::POST,
        "/api/classification/photos",
        Some(json!({ "photos": [{ "name": "../beach.png", "data": data }] })),
      )
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["photos"][0]["name"], ".._beach.png");

    let request = Request::builder()
      .uri("/api/classification/photos/0")
      .body(Body::empty())
      .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");

    let (status, _) = h.call(Method::GET, "/api/classification/photos/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, cleared) = h.call(Method::POST, "/api/clear-temp", None).await;
    assert_eq!(cleared["removed"], true);
    assert_eq!(cleared["forgotten"], 1);
    assert!(!Path::new(&h.root.join("uploads")).exists());
  }

  #[tokio::test]
  async fn bad_base64_is_a_client_error() {
    let (h, _idle) = harness(false);
    let (status, body) = h
      .call(
        Method::POST,
        "/api/renaming/photos",
        Some(json!({ "photos": [{ "name": "x.jpg", "data": "***" }] })),
      )
      .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }
}
