// 该文件是 Zhaopian （照片） 项目的一部分。
// src/model/language.rs - 翻译目标语言
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

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// 描述与检测结果都是英文
pub const SOURCE_LANGUAGE: &str = "en_XX";

pub const DEFAULT_LANGUAGE: &str = "Russian";

/// mBART-50 支持的语言：(显示名称, 语言代码)
pub const LANGUAGES: &[(&str, &str)] = &[
  ("Afrikaans", "af_ZA"),
  ("Arabic", "ar_AR"),
  ("Azerbaijani", "az_AZ"),
  ("Bengali", "bn_IN"),
  ("Burmese", "my_MM"),
  ("Chinese", "zh_CN"),
  ("Croatian", "hr_HR"),
  ("Czech", "cs_CZ"),
  ("Dutch", "nl_XX"),
  ("English", "en_XX"),
  ("Estonian", "et_EE"),
  ("Finnish", "fi_FI"),
  ("French", "fr_XX"),
  ("Galician", "gl_ES"),
  ("Georgian", "ka_GE"),
  ("German", "de_DE"),
  ("Gujarati", "gu_IN"),
  ("Hebrew", "he_IL"),
  ("Hindi", "hi_IN"),
  ("Indonesian", "id_ID"),
  ("Italian", "it_IT"),
  ("Japanese", "ja_XX"),
  ("Kazakh", "kk_KZ"),
  ("Khmer", "km_KH"),
  ("Korean", "ko_KR"),
  ("Latvian", "lv_LV"),
  ("Lithuanian", "lt_LT"),
  ("Macedonian", "mk_MK"),
  ("Malayalam", "ml_IN"),
  ("Marathi", "mr_IN"),
  ("Mongolian", "mn_MN"),
  ("Nepali", "ne_NP"),
  ("Pashto", "ps_AF"),
  ("Persian", "fa_IR"),
  ("Polish", "pl_PL"),
  ("Portuguese", "pt_XX"),
  ("Romanian", "ro_RO"),
  ("Russian", "ru_RU"),
  ("Sinhala", "si_LK"),
  ("Slovene", "sl_SI"),
  ("Spanish", "es_XX"),
  ("Swahili", "sw_KE"),
  ("Swedish", "sv_SE"),
  ("Tagalog", "tl_XX"),
  ("Tamil", "ta_IN"),
  ("Telugu", "te_IN"),
  ("Thai", "th_TH"),
  ("Turkish", "tr_TR"),
  ("Ukrainian", "uk_UA"),
  ("Urdu", "ur_PK"),
  ("Vietnamese", "vi_VN"),
  ("Xhosa", "xh_ZA"),
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LanguageError {
  #[error("未知的目标语言: {0}")]
  Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Language {
  pub name: &'static str,
  pub code: &'static str,
}

impl Language {
  /// 接受显示名称（不区分大小写）或语言代码
  pub fn from_name(value: &str) -> Result<Self, LanguageError> {
    let value = value.trim();
    LANGUAGES
      .iter()
      .find(|(name, code)| name.eq_ignore_ascii_case(value) || *code == value)
      .map(|&(name, code)| Language { name, code })
      .ok_or_else(|| LanguageError::Unknown(value.to_string()))
  }

  pub fn all() -> impl Iterator<Item = Language> {
    LANGUAGES
      .iter()
      .map(|&(name, code)| Language { name, code })
  }
}

impl FromStr for Language {
  type Err = LanguageError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Language::from_name(s)
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name, self.code)
  }
}
