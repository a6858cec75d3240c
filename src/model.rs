// 该文件是 Zhaopian （照片） 项目的一部分。
// src/model.rs - 模型
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

/// 没有任何检测结果时的主体名称
pub const UNKNOWN_OBJECT: &str = "unknown";

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

impl<M: Model> Model for std::sync::Arc<M> {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

impl DetectItem {
  pub fn area(&self) -> f32 {
    (self.bbox[2] - self.bbox[0]) * (self.bbox[3] - self.bbox[1])
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// 面积最大的检测框对应的类别；面积相同取先出现者
  pub fn main_object(&self) -> &str {
    let mut max_area = -1.0f32;
    let mut main = UNKNOWN_OBJECT;
    for item in self.items.iter() {
      let area = item.area();
      if area > max_area {
        max_area = area;
        main = &item.label;
      }
    }
    main
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

mod caption;
mod detection;
pub mod hub;
pub mod language;
pub mod registry;
mod translation;

pub use self::caption::{CaptionCleaner, Captioner, FALLBACK_CAPTION, HubCaptionModel};
pub use self::detection::{DEFAULT_THRESHOLD, HubDetectionModel, MainObject};
pub use self::hub::{HubClient, HubError};
pub use self::language::{Language, LanguageError, SOURCE_LANGUAGE};
pub use self::registry::{ModelEntry, RegistryError};
pub use self::translation::{CachedTranslator, HubTranslationModel, TranslationRequest};
