// 该文件是 Zhaopian （照片） 项目的一部分。
// src/model/caption.rs - 图像描述生成
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

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::frame::PhotoFrame;
use crate::model::hub::{HubClient, HubError, OneOrMany};
use crate::model::{Model, ModelEntry};

/// 清理后为空时使用的描述
pub const FALLBACK_CAPTION: &str = "untitled photo";

const UNWANTED_PATTERNS: &[&str] = &[
  ".",
  "gif",
  "png",
  "jpg",
  "jpeg",
  "webp",
  "bmp",
  "tiff",
  "[ unused0 ]",
  "image of",
  "photo of",
  "picture of",
  "a screen shot",
  "a close up",
  "a drawing of",
  "a rendering of",
];

const MAX_NEW_TOKENS: u32 = 50;
const NUM_BEAMS: u32 = 2;

/// 去掉描述中的文件扩展名、"photo of" 之类的套话以及多余空白
#[derive(Debug, Clone)]
pub struct CaptionCleaner {
  unwanted: Regex,
}

impl CaptionCleaner {
  pub fn new() -> Result<Self, regex::Error> {
    let alternation = UNWANTED_PATTERNS
      .iter()
      .map(|pattern| regex::escape(pattern))
      .collect::<Vec<_>>()
      .join("|");
    let unwanted = RegexBuilder::new(&format!("(?:{})", alternation))
      .case_insensitive(true)
      .build()?;
    Ok(Self { unwanted })
  }

  pub fn clean(&self, caption: &str) -> String {
    let filtered = self.unwanted.replace_all(caption, "");
    let filtered = filtered.split_whitespace().collect::<Vec<_>>().join(" ");
    let filtered = filtered.trim_end_matches('.').trim();

    if filtered.is_empty() {
      FALLBACK_CAPTION.to_string()
    } else {
      filtered.to_string()
    }
  }
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
  #[serde(default)]
  generated_text: String,
}

/// 托管的图像描述模型，返回未经清理的描述
#[derive(Debug, Clone)]
pub struct HubCaptionModel {
  client: Arc<HubClient>,
  repo_id: String,
}

impl HubCaptionModel {
  pub fn new(client: Arc<HubClient>, entry: &ModelEntry) -> Self {
    Self {
      client,
      repo_id: entry.repo_id.to_string(),
    }
  }
}

impl Model for HubCaptionModel {
  type Input = PhotoFrame;
  type Output = String;
  type Error = HubError;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("生成描述: {} | 模型: {}", frame.name, self.repo_id);
    let body = json!({
      "inputs": frame.to_base64_jpeg()?,
      "parameters": {
        "max_new_tokens": MAX_NEW_TOKENS,
        "num_beams": NUM_BEAMS,
        "no_repeat_ngram_size": 3,
        "length_penalty": 0.8,
        "early_stopping": true,
      },
    });

    let reply: OneOrMany<GeneratedText> = self.client.post_json(&self.repo_id, &body)?;
    Ok(
      reply
        .into_vec()
        .into_iter()
        .next()
        .map(|text| text.generated_text)
        .unwrap_or_default(),
    )
  }
}

/// 在任意描述模型之上做清理
pub struct Captioner<M> {
  model: M,
  cleaner: CaptionCleaner,
}

impl<M> Captioner<M> {
  pub fn new(model: M) -> Result<Self, regex::Error> {
    Ok(Self {
      model,
      cleaner: CaptionCleaner::new()?,
    })
  }
}

impl<M: Model<Input = PhotoFrame, Output = String>> Model for Captioner<M> {
  type Input = PhotoFrame;
  type Output = String;
  type Error = M::Error;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    let raw = self.model.infer(frame)?;
    let caption = self.cleaner.clean(&raw);
    debug!("{} 的原始描述: '{}' | 清理后: '{}'", frame.name, raw, caption);
    info!("描述生成成功: {} -> {}", frame.name, caption);
    Ok(caption)
  }
}
