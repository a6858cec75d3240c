// 该文件是 Zhaopian （照片） 项目的一部分。
// src/handler.rs - 重命名与分类两种处理流程
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
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::frame::PhotoFrame;
use crate::input::CAPTION_MAX_SIDE;
use crate::model::registry::{
  self, CAPTION_MODELS, DEFAULT_CAPTION_MODEL, DEFAULT_DETECTION_MODEL, DETECTION_MODELS,
  TRANSLATION_MODELS,
};
use crate::model::{
  CachedTranslator, Captioner, DEFAULT_THRESHOLD, HubCaptionModel, HubClient, HubDetectionModel,
  HubError, HubTranslationModel, Language, LanguageError, MainObject, Model, ModelEntry,
  RegistryError, TranslationRequest,
};

#[derive(Error, Debug)]
pub enum HandlerError {
  #[error("模型选择错误: {0}")]
  Registry(#[from] RegistryError),
  #[error("目标语言错误: {0}")]
  Language(#[from] LanguageError),
  #[error("未知的处理模式: {0}")]
  UnknownMode(String),
  #[error("描述过滤规则无效: {0}")]
  Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  /// 按图像描述重命名
  Renaming,
  /// 按主体类别分类
  Classification,
}

impl Mode {
  pub const ALL: [Mode; 2] = [Mode::Renaming, Mode::Classification];

  pub fn as_str(self) -> &'static str {
    match self {
      Mode::Renaming => "renaming",
      Mode::Classification => "classification",
    }
  }

  /// 结果表格中标签列的名称
  pub fn column_name(self) -> &'static str {
    match self {
      Mode::Renaming => "New name",
      Mode::Classification => "Class",
    }
  }

  /// 名称为空时使用的前缀
  pub fn default_prefix(self) -> &'static str {
    match self {
      Mode::Renaming => "",
      Mode::Classification => "unknown_class",
    }
  }

  pub fn label_models(self) -> &'static [ModelEntry] {
    match self {
      Mode::Renaming => CAPTION_MODELS,
      Mode::Classification => DETECTION_MODELS,
    }
  }

  pub fn default_label_model(self) -> &'static str {
    match self {
      Mode::Renaming => DEFAULT_CAPTION_MODEL,
      Mode::Classification => DEFAULT_DETECTION_MODEL,
    }
  }

  /// 描述模型使用缩略图，检测模型使用原图以保持坐标
  pub fn max_side(self) -> Option<u32> {
    match self {
      Mode::Renaming => Some(CAPTION_MAX_SIDE),
      Mode::Classification => None,
    }
  }
}

impl FromStr for Mode {
  type Err = HandlerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Mode::ALL
      .into_iter()
      .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| HandlerError::UnknownMode(s.to_string()))
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 一张照片的英文标签及其译文
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Labelled {
  pub original: String,
  pub translated: String,
}

/// 标注模型 + 翻译模型
///
/// 翻译失败不算照片处理失败，此时保留英文标签。
pub struct PhotoPipeline<L, T> {
  labeler: L,
  translator: T,
  target: Language,
}

impl<L, T> PhotoPipeline<L, T> {
  pub fn new(labeler: L, translator: T, target: Language) -> Self {
    Self {
      labeler,
      translator,
      target,
    }
  }

  pub fn target(&self) -> Language {
    self.target
  }
}

impl<L, T> Model for PhotoPipeline<L, T>
where
  L: Model<Input = PhotoFrame, Output = String>,
  T: Model<Input = TranslationRequest, Output = String>,
  T::Error: fmt::Display,
{
  type Input = PhotoFrame;
  type Output = Labelled;
  type Error = L::Error;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    let original = self.labeler.infer(frame)?;
    let request = TranslationRequest::from_english(original.clone(), self.target);
    let translated = match self.translator.infer(&request) {
      Ok(translated) => translated,
      Err(err) => {
        warn!("{} 的标签翻译失败，保留原文 '{}': {}", frame.name, original, err);
        original.clone()
      }
    };
    Ok(Labelled {
      original,
      translated,
    })
  }
}

pub enum LabelerWrapper {
  Caption(Captioner<HubCaptionModel>),
  Detection(MainObject<HubDetectionModel>),
}

impl LabelerWrapper {
  /// `threshold` 只用于分类模式的检测模型
  pub fn new(
    mode: Mode,
    client: Arc<HubClient>,
    entry: &ModelEntry,
    threshold: f32,
  ) -> Result<Self, HandlerError> {
    Ok(match mode {
      Mode::Renaming => LabelerWrapper::Caption(Captioner::new(HubCaptionModel::new(client, entry))?),
      Mode::Classification => LabelerWrapper::Detection(MainObject::new(
        HubDetectionModel::new(client, entry).threshold(threshold),
      )),
    })
  }
}

impl Model for LabelerWrapper {
  type Input = PhotoFrame;
  type Output = String;
  type Error = HubError;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      LabelerWrapper::Caption(model) => model.infer(frame),
      LabelerWrapper::Detection(model) => model.infer(frame),
    }
  }
}

pub type SharedTranslator = Arc<CachedTranslator<HubTranslationModel>>;
pub type HubPipeline = PhotoPipeline<LabelerWrapper, SharedTranslator>;

/// 按模型名称构建处理流程
///
/// 每个翻译模型只创建一次，翻译缓存在多次批处理之间保留。
pub struct PipelineFactory {
  client: Arc<HubClient>,
  translators: HashMap<&'static str, SharedTranslator>,
  threshold: f32,
}

impl PipelineFactory {
  pub fn new(client: HubClient) -> Self {
    Self {
      client: Arc::new(client),
      translators: HashMap::new(),
      threshold: DEFAULT_THRESHOLD,
    }
  }

  /// 检测模型的置信度阈值
  pub fn threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn translator(&mut self, name: &str) -> Result<SharedTranslator, HandlerError> {
    let entry = registry::lookup(TRANSLATION_MODELS, name)?;
    let client = &self.client;
    let translator = self.translators.entry(entry.repo_id).or_insert_with(|| {
      info!("创建翻译模型: {}", entry.repo_id);
      Arc::new(CachedTranslator::new(HubTranslationModel::new(
        client.clone(),
        entry,
      )))
    });
    Ok(translator.clone())
  }

  pub fn build(
    &mut self,
    mode: Mode,
    label_model: &str,
    translation_model: &str,
    language: &str,
  ) -> Result<HubPipeline, HandlerError> {
    let entry = registry::lookup(mode.label_models(), label_model)?;
    let target = Language::from_name(language)?;
    let translator = self.translator(translation_model)?;
    info!(
      "处理流程就绪: {} | 标注模型: {} | 翻译模型: {} | 目标语言: {}",
      mode, entry.name, translation_model, target
    );
    Ok(PhotoPipeline::new(
      LabelerWrapper::new(mode, self.client.clone(), entry, self.threshold)?,
      translator,
      target,
    ))
  }
}
