// 该文件是 Zhaopian （照片） 项目的一部分。
// src/args.rs - 各程序共用的命令行参数
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

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use url::Url;

use crate::FromUrl;
use crate::handler::Mode;
use crate::model::hub::DEFAULT_HUB_URL;
use crate::model::language::DEFAULT_LANGUAGE;
use crate::model::registry::DEFAULT_TRANSLATION_MODEL;
use crate::model::{DEFAULT_THRESHOLD, HubClient, HubError};

/// 推理服务参数
#[derive(Args, Debug, Clone)]
pub struct HubArgs {
  /// 推理服务地址
  /// 支持格式:
  /// - hf://api-inference.huggingface.co
  /// - hf://<host>/<prefix>
  /// - http(s)://<host>/<path>/（自建服务）
  #[arg(long, value_name = "URL", default_value = DEFAULT_HUB_URL)]
  pub hub: Url,

  /// 访问令牌
  #[arg(long, env = "HF_TOKEN", hide_env_values = true, value_name = "TOKEN")]
  pub token: Option<String>,

  /// 模型加载中（503）时的最大重试次数
  #[arg(long, default_value_t = 3, value_name = "COUNT")]
  pub max_retries: u32,

  /// 每次等待模型加载的最长秒数
  #[arg(long, default_value_t = 60, value_name = "SECONDS")]
  pub max_wait: u64,
}

impl HubArgs {
  pub fn client(&self) -> Result<HubClient, HubError> {
    Ok(
      HubClient::from_url(&self.hub)?
        .token(self.token.clone())
        .max_retries(self.max_retries)
        .max_wait(Duration::from_secs(self.max_wait)),
    )
  }
}

/// 模型与目标语言
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
  /// 描述模型（重命名）或检测模型（分类），缺省时按模式选择
  #[arg(long, value_name = "MODEL")]
  pub label_model: Option<String>,

  /// 翻译模型
  #[arg(long, default_value = DEFAULT_TRANSLATION_MODEL, value_name = "MODEL")]
  pub translation_model: String,

  /// 目标语言（名称或 mBART 语言代码）
  #[arg(long, default_value = DEFAULT_LANGUAGE, value_name = "LANGUAGE")]
  pub language: String,
}

impl ModelArgs {
  pub fn label_model(&self, mode: Mode) -> &str {
    self
      .label_model
      .as_deref()
      .unwrap_or_else(|| mode.default_label_model())
  }
}

/// 目标检测参数（分类模式）
#[derive(Args, Debug, Clone)]
pub struct DetectionArgs {
  /// 检测置信度阈值
  #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_name = "SCORE")]
  pub threshold: f32,
}

#[derive(Args, Debug, Clone)]
pub struct LogArgs {
  /// 日志文件目录
  #[arg(long, env = "ZHAOPIAN_LOG_DIR", value_name = "DIR")]
  pub log_dir: Option<PathBuf>,
}

/// 命令行批处理参数
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
  /// 照片文件或目录
  #[arg(required = true, value_name = "PATH")]
  pub inputs: Vec<PathBuf>,

  /// 输出目录
  #[arg(long, short, default_value = "output", value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 只输出结果，不保存文件
  #[arg(long)]
  pub dry_run: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct TestArgs {
    #[command(flatten)]
    hub: HubArgs,
    #[command(flatten)]
    model: ModelArgs,
    #[command(flatten)]
    detection: DetectionArgs,
    #[command(flatten)]
    batch: BatchArgs,
  }

  #[test]
  fn defaults_are_filled_in() {
    let args = TestArgs::try_parse_from(["test", "photos"]).unwrap();
    assert_eq!(args.hub.hub.as_str(), DEFAULT_HUB_URL);
    assert_eq!(args.model.language, DEFAULT_LANGUAGE);
    assert_eq!(args.model.label_model(Mode::Renaming), Mode::Renaming.default_label_model());
    assert_eq!(args.batch.output_dir, PathBuf::from("output"));
    assert!(!args.batch.dry_run);
    assert_eq!(args.hub.max_wait, 60);
    assert_eq!(args.detection.threshold, DEFAULT_THRESHOLD);
  }

  #[test]
  fn hub_args_build_client() {
    let args = TestArgs::try_parse_from([
      "test",
      "--hub",
      "http://localhost:8080/models/",
      "--label-model",
      "detr-resnet-50",
      "a.jpg",
      "b.jpg",
    ])
    .unwrap();
    let client = args.hub.client().unwrap();
    assert_eq!(client.base().as_str(), "http://localhost:8080/models/");
    assert_eq!(args.model.label_model(Mode::Classification), "detr-resnet-50");
    assert_eq!(args.batch.inputs.len(), 2);
  }

  #[test]
  fn threshold_and_wait_are_configurable() {
    let args = TestArgs::try_parse_from([
      "test",
      "--threshold",
      "0.8",
      "--max-wait",
      "5",
      "a.jpg",
    ])
    .unwrap();
    assert_eq!(args.detection.threshold, 0.8);
    assert_eq!(args.hub.max_wait, 5);
    assert!(args.hub.client().is_ok());
    assert!(TestArgs::try_parse_from(["test", "--threshold", "high", "a.jpg"]).is_err());
  }

  #[test]
  fn inputs_are_required() {
    assert!(TestArgs::try_parse_from(["test"]).is_err());
  }
}
