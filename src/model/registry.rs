// 该文件是 Zhaopian （照片） 项目的一部分。
// src/model/registry.rs - 可选模型列表
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

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
  /// 界面与命令行中使用的短名称
  pub name: &'static str,
  /// 模型仓库 ID
  pub repo_id: &'static str,
  /// 模型结构名称，仅用于日志
  pub architecture: &'static str,
}

const fn entry(
  name: &'static str,
  repo_id: &'static str,
  architecture: &'static str,
) -> ModelEntry {
  ModelEntry {
    name,
    repo_id,
    architecture,
  }
}

pub const CAPTION_MODELS: &[ModelEntry] = &[
  entry("git-base-coco", "microsoft/git-base-coco", "AutoModelForCausalLM"),
  entry("git-large-coco", "microsoft/git-large-coco", "AutoModelForCausalLM"),
  entry(
    "blip-image-captioning-base",
    "Salesforce/blip-image-captioning-base",
    "BlipForConditionalGeneration",
  ),
  entry(
    "blip-image-captioning-large",
    "Salesforce/blip-image-captioning-large",
    "BlipForConditionalGeneration",
  ),
  entry(
    "vit-gpt2-image-captioning",
    "nlpconnect/vit-gpt2-image-captioning",
    "VisionEncoderDecoderModel",
  ),
  entry(
    "Qwen2-VL-7B-Instruct-GPTQ-Int4",
    "Qwen/Qwen2-VL-7B-Instruct-GPTQ-Int4",
    "Qwen2VLForConditionalGeneration",
  ),
];

pub const DETECTION_MODELS: &[ModelEntry] = &[
  entry("Florence-2-large-ft", "microsoft/Florence-2-large-ft", "AutoModelForCausalLM"),
  entry("Florence-2-large", "microsoft/Florence-2-large", "AutoModelForCausalLM"),
  entry("Florence-2-base-ft", "microsoft/Florence-2-base-ft", "AutoModelForCausalLM"),
  entry("Florence-2-base", "microsoft/Florence-2-base", "AutoModelForCausalLM"),
  entry("detr-resnet-50", "facebook/detr-resnet-50", "DetrForObjectDetection"),
  entry("detr-resnet-101", "facebook/detr-resnet-101", "DetrForObjectDetection"),
];

pub const TRANSLATION_MODELS: &[ModelEntry] = &[entry(
  "mbart-large-50-many-to-many-mmt",
  "facebook/mbart-large-50-many-to-many-mmt",
  "MBartForConditionalGeneration",
)];

pub const DEFAULT_CAPTION_MODEL: &str = "blip-image-captioning-base";
pub const DEFAULT_DETECTION_MODEL: &str = "Florence-2-base";
pub const DEFAULT_TRANSLATION_MODEL: &str = "mbart-large-50-many-to-many-mmt";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
  #[error("模型 {name} 不受支持，可用模型: {available}")]
  Unsupported { name: String, available: String },
}

/// 按短名称或仓库 ID 查找模型
pub fn lookup(table: &'static [ModelEntry], name: &str) -> Result<&'static ModelEntry, RegistryError> {
  let name = name.trim();
  match table
    .iter()
    .find(|entry| entry.name == name || entry.repo_id == name)
  {
    Some(entry) => {
      info!(
        "选择模型: {} | 仓库: {} | 结构: {}",
        entry.name, entry.repo_id, entry.architecture
      );
      Ok(entry)
    }
    None => {
      let available = names(table).collect::<Vec<_>>().join(", ");
      error!("模型 {} 不受支持，可用模型: {}", name, available);
      Err(RegistryError::Unsupported {
        name: name.to_string(),
        available,
      })
    }
  }
}

pub fn names(table: &'static [ModelEntry]) -> impl Iterator<Item = &'static str> {
  table.iter().map(|entry| entry.name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookup_accepts_short_name_and_repo_id() {
    let by_name = lookup(CAPTION_MODELS, "blip-image-captioning-base").unwrap();
    let by_repo = lookup(CAPTION_MODELS, "Salesforce/blip-image-captioning-base").unwrap();
    assert_eq!(by_name, by_repo);
    assert_eq!(by_name.architecture, "BlipForConditionalGeneration");
  }

  #[test]
  fn unknown_models_list_alternatives() {
    let err = lookup(TRANSLATION_MODELS, "nllb-200").unwrap_err();
    let RegistryError::Unsupported { name, available } = err;
    assert_eq!(name, "nllb-200");
    assert_eq!(available, "mbart-large-50-many-to-many-mmt");
  }

  #[test]
  fn defaults_are_registered() {
    assert!(lookup(CAPTION_MODELS, DEFAULT_CAPTION_MODEL).is_ok());
    assert!(lookup(DETECTION_MODELS, DEFAULT_DETECTION_MODEL).is_ok());
    assert!(lookup(TRANSLATION_MODELS, DEFAULT_TRANSLATION_MODEL).is_ok());
  }
}
