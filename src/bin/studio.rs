// 该文件是 Zhaopian （照片） 项目的一部分。
// src/bin/studio.rs - 网页界面服务
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

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use zhaopian::{
  args::{DetectionArgs, HubArgs, LogArgs},
  handler::PipelineFactory,
  studio::{self, StudioConfig, StudioState},
  utils,
};

/// 照片重命名与分类的网页界面
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub hub: HubArgs,
  #[command(flatten)]
  pub detection: DetectionArgs,
  #[command(flatten)]
  pub log: LogArgs,

  /// 监听端口
  #[arg(long, short, default_value_t = 7860, value_name = "PORT")]
  pub port: u16,

  /// 默认输出目录
  #[arg(long, default_value = "results", value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 上传照片的临时目录
  #[arg(long, value_name = "DIR")]
  pub upload_dir: Option<PathBuf>,
}

async fn serve(state: StudioState, port: u16) -> Result<()> {
  let app = studio::router(state);
  let addr = SocketAddr::from(([127, 0, 0, 1], port));
  info!("界面地址: http://{}", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!("收到中断信号，正在退出...");
    })
    .await?;
  Ok(())
}

fn main() -> Result<()> {
  let args = Args::parse();
  utils::init_logging(args.log.log_dir.as_deref())?;

  let config = StudioConfig {
    upload_dir: args.upload_dir.unwrap_or_else(utils::upload_dir),
    output_dir: args.output_dir,
  };
  info!("推理服务: {}", args.hub.hub);
  info!("上传目录: {}", config.upload_dir.display());
  info!("默认输出目录: {}", config.output_dir.display());

  // 阻塞客户端在异步运行时之外创建，只在模型线程中使用和释放
  let factory = PipelineFactory::new(args.hub.client()?).threshold(args.detection.threshold);
  let (tx, rx) = mpsc::channel();
  let state = StudioState::new(config, tx);
  let worker = studio::spawn_worker(factory, rx, state.clone())?;

  let runtime = tokio::runtime::Runtime::new()?;
  runtime.block_on(serve(state.clone(), args.port))?;

  state.shutdown_worker();
  worker
    .join()
    .map_err(|_| anyhow::anyhow!("模型线程异常退出"))?;
  Ok(())
}
