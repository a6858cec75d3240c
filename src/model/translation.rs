// 该文件是 Zhaopian （照片） 项目的一部分。
// src/model/translation.rs - 多语言翻译与缓存
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

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::model::hub::{HubClient, HubError, OneOrMany};
use crate::model::{Language, Model, ModelEntry, SOURCE_LANGUAGE};

const CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::new(500).unwrap();
const MAX_NEW_TOKENS: u32 = 64;
const NUM_BEAMS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
  pub text: String,
  /// 源语言代码
  pub src_lang: &'static str,
  pub tgt_lang: Language,
}

impl TranslationRequest {
  /// 从英文翻译到目标语言
  pub fn from_english(text: impl Into<String>, tgt_lang: Language) -> Self {
    Self {
      text: text.into(),
      src_lang: SOURCE_LANGUAGE,
      tgt_lang,
    }
  }
}

#[derive(Debug, Deserialize)]
struct TranslationText {
  #[serde(default)]
  translation_text: String,
}

#[derive(Debug, Clone)]
pub struct HubTranslationModel {
  client: Arc<HubClient>,
  repo_id: String,
}

impl HubTranslationModel {
  pub fn new(client: Arc<HubClient>, entry: &ModelEntry) -> Self {
    Self {
      client,
      repo_id: entry.repo_id.to_string(),
    }
  }
}

impl Model for HubTranslationModel {
  type Input = TranslationRequest;
  type Output = String;
  type Error = HubError;

  fn infer(&self, request: &Self::Input) -> Result<Self::Output, Self::Error> {
    if request.src_lang == request.tgt_lang.code {
      return Ok(request.text.clone());
    }

    let body = json!({
      "inputs": request.text,
      "parameters": {
        "src_lang": request.src_lang,
        "tgt_lang": request.tgt_lang.code,
        "max_new_tokens": MAX_NEW_TOKENS,
        "num_beams": NUM_BEAMS,
        "early_stopping": true,
      },
    });

    let reply: OneOrMany<TranslationText> = self.client.post_json(&self.repo_id, &body)?;
    let translated = reply
      .into_vec()
      .into_iter()
      .map(|text| text.translation_text.trim().to_string())
      .find(|text| !text.is_empty())
      .ok_or(HubError::EmptyResponse)?;
    debug!(
      "翻译 '{}' ({} -> {}): '{}'",
      request.text, request.src_lang, request.tgt_lang.code, translated
    );
    Ok(translated)
  }
}

type CacheKey = (String, &'static str, &'static str);

/// 翻译结果的 LRU 缓存，只缓存成功的翻译
pub struct CachedTranslator<M> {
  model: M,
  cache: Mutex<LruCache<CacheKey, String>>,
}

impl<M> CachedTranslator<M> {
  pub fn new(model: M) -> Self {
    Self {
      model,
      cache: Mutex::new(LruCache::new(CACHE_CAPACITY)),
    }
  }

  pub fn cached(&self) -> usize {
    self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

impl<M: Model<Input = TranslationRequest, Output = String>> Model for CachedTranslator<M> {
  type Input = TranslationRequest;
  type Output = String;
  type Error = M::Error;

  fn infer(&self, request: &Self::Input) -> Result<Self::Output, Self::Error> {
    let key = (request.text.clone(), request.src_lang, request.tgt_lang.code);
    if let Some(hit) = self
      .cache
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key)
    {
      debug!("翻译缓存命中: '{}' -> '{}'", request.text, hit);
      return Ok(hit.clone());
    }

    let translated = self.model.infer(request)?;
    info!(
      "翻译成功: '{}' -> '{}' ({})",
      request.text, translated, request.tgt_lang.name
    );
    self
      .cache
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .put(key, translated.clone());
    Ok(translated)
  }
}
