// 该文件是 Zhaopian （照片） 项目的一部分。
// src/model/detection.rs - 开放词表目标检测
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

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::frame::PhotoFrame;
use crate::model::hub::{HubClient, HubError, OneOrMany};
use crate::model::{DetectItem, DetectResult, Model, ModelEntry};

/// 检测结果的默认置信度阈值
pub const DEFAULT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Deserialize)]
struct BoxCoords {
  xmin: f32,
  ymin: f32,
  xmax: f32,
  ymax: f32,
}

#[derive(Debug, Deserialize)]
struct DetectionEntry {
  label: String,
  #[serde(default)]
  score: f32,
  #[serde(rename = "box")]
  bbox: BoxCoords,
}

fn round2(value: f32) -> f32 {
  (value * 100.0).round() / 100.0
}

impl From<DetectionEntry> for DetectItem {
  fn from(entry: DetectionEntry) -> Self {
    DetectItem {
      label: entry.label.to_lowercase(),
      score: entry.score,
      bbox: [
        round2(entry.bbox.xmin),
        round2(entry.bbox.ymin),
        round2(entry.bbox.xmax),
        round2(entry.bbox.ymax),
      ],
    }
  }
}

/// 托管的目标检测模型，坐标为原图像素坐标
#[derive(Debug, Clone)]
pub struct HubDetectionModel {
  client: Arc<HubClient>,
  repo_id: String,
  threshold: f32,
}

impl HubDetectionModel {
  pub fn new(client: Arc<HubClient>, entry: &ModelEntry) -> Self {
    Self {
      client,
      repo_id: entry.repo_id.to_string(),
      threshold: DEFAULT_THRESHOLD,
    }
  }

  pub fn threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }
}

impl Model for HubDetectionModel {
  type Input = PhotoFrame;
  type Output = DetectResult;
  type Error = HubError;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!(
      "目标检测: {} | 尺寸: {}x{} | 阈值: {}",
      frame.name,
      frame.width(),
      frame.height(),
      self.threshold
    );
    let body = json!({
      "inputs": frame.to_base64_jpeg()?,
      "parameters": { "threshold": self.threshold },
    });

    let reply: OneOrMany<DetectionEntry> = self.client.post_json(&self.repo_id, &body)?;
    let items: Vec<DetectItem> = reply.into_vec().into_iter().map(DetectItem::from).collect();
    debug!("{} 检测到 {} 个物体: {:?}", frame.name, items.len(), items);

    Ok(DetectResult::from(items))
  }
}

/// 把检测结果归结为面积最大的主体类别
pub struct MainObject<M> {
  model: M,
}

impl<M> MainObject<M> {
  pub fn new(model: M) -> Self {
    Self { model }
  }
}

impl<M: Model<Input = PhotoFrame, Output = DetectResult>> Model for MainObject<M> {
  type Input = PhotoFrame;
  type Output = String;
  type Error = M::Error;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    let result = self.model.infer(frame)?;
    let main = result.main_object().to_string();
    info!("{} 的主体: {} (共 {} 个检测框)", frame.name, main, result.len());
    Ok(main)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::UNKNOWN_OBJECT;
  use crate::model::hub::testing::{base_url, blocking, requests};
  use crate::model::registry::{DETECTION_MODELS, lookup};
  use image::{Rgb, RgbImage};
  use serde_json::Value;
  use std::path::Path;
  use url::Url;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn frame() -> PhotoFrame {
    PhotoFrame::new(0, Path::new("desk.png"), RgbImage::from_pixel(64, 48, Rgb([5, 5, 5])))
  }

  async fn server(reply: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/models/facebook/detr-resnet-50"))
      .respond_with(ResponseTemplate::new(200).set_body_json(reply))
      .mount(&server)
      .await;
    server
  }

  fn detector(base: Url) -> Result<HubDetectionModel, HubError> {
    let client = Arc::new(HubClient::new(base)?);
    let entry = lookup(DETECTION_MODELS, "detr-resnet-50").unwrap();
    Ok(HubDetectionModel::new(client, entry))
  }

  #[tokio::test]
  async fn detections_are_normalized() {
    let server = server(json!([
      {"label": "Laptop", "score": 0.97, "box": {"xmin": 1.234, "ymin": 2.0, "xmax": 30.556, "ymax": 40.0}},
      {"label": "CUP", "score": 0.8, "box": {"xmin": 0, "ymin": 0, "xmax": 5, "ymax": 5}}
    ]))
    .await;

    let base = base_url(&server);
    let result = blocking(move || detector(base)?.infer(&frame()))
      .await
      .unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.items[0].label, "laptop");
    assert_eq!(result.items[0].bbox, [1.23, 2.0, 30.56, 40.0]);
    assert_eq!(result.main_object(), "laptop");

    let requests = requests(&server).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1["parameters"]["threshold"], 0.5);
  }

  #[tokio::test]
  async fn threshold_is_passed_to_the_endpoint() {
    let server = server(json!([])).await;

    let base = base_url(&server);
    blocking(move || detector(base)?.threshold(0.25).infer(&frame()))
      .await
      .unwrap();

    let requests = requests(&server).await;
    assert_eq!(requests[0].1["parameters"]["threshold"], 0.25);
  }

  #[tokio::test]
  async fn main_object_wrapper_reports_unknown_for_empty_scene() {
    let server = server(json!([])).await;

    let base = base_url(&server);
    let main = blocking(move || MainObject::new(detector(base)?).infer(&frame()))
      .await
      .unwrap();
    assert_eq!(main, UNKNOWN_OBJECT);
  }
}
