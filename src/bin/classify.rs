// 该文件是 Zhaopian （照片） 项目的一部分。
// src/bin/classify.rs - 按主体类别批量整理照片
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use zhaopian::{
  args::{BatchArgs, DetectionArgs, HubArgs, LogArgs, ModelArgs},
  cli,
  handler::{Mode, PipelineFactory},
  utils,
};

/// 用目标检测模型找出照片主体，按翻译后的类别分目录保存
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub hub: HubArgs,
  #[command(flatten)]
  pub model: ModelArgs,
  #[command(flatten)]
  pub detection: DetectionArgs,
  #[command(flatten)]
  pub batch: BatchArgs,
  #[command(flatten)]
  pub log: LogArgs,
}

fn main() -> Result<()> {
  let args = Args::parse();
  utils::init_logging(args.log.log_dir.as_deref())?;

  info!("推理服务: {}", args.hub.hub);
  info!("检测阈值: {}", args.detection.threshold);
  let factory = PipelineFactory::new(args.hub.client()?).threshold(args.detection.threshold);
  cli::run_batch(Mode::Classification, factory, &args.model, &args.batch)
}
