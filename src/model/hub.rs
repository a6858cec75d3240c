// 该文件是 Zhaopian （照片） 项目的一部分。
// src/model/hub.rs - 模型推理服务客户端
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

use std::thread;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

pub const HF_DEFAULT_HOST: &str = "api-inference.huggingface.co";
pub const DEFAULT_HUB_URL: &str = "hf://api-inference.huggingface.co";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);
const FALLBACK_WAIT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum HubError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("推理服务地址无效: {0}")]
  InvalidUrl(#[from] url::ParseError),
  #[error("HTTP 错误: {0}")]
  Http(#[from] reqwest::Error),
  #[error("推理服务返回 {status}: {message}")]
  Status { status: u16, message: String },
  #[error("模型 {model} 仍在加载，已尝试 {attempts} 次")]
  ModelLoading { model: String, attempts: u32 },
  #[error("响应解析错误: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("图像编码错误: {0}")]
  Encode(#[from] image::ImageError),
  #[error("推理服务返回空结果")]
  EmptyResponse,
}

/// 推理服务的错误响应体
#[derive(Debug, Deserialize)]
struct ErrorBody {
  #[serde(default)]
  error: Option<Value>,
  #[serde(default)]
  estimated_time: Option<f64>,
}

impl ErrorBody {
  fn message(&self) -> Option<String> {
    match self.error.as_ref()? {
      Value::String(message) => Some(message.clone()),
      other => Some(other.to_string()),
    }
  }
}

/// 单个对象或对象列表
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
  Many(Vec<T>),
  One(T),
}

impl<T> OneOrMany<T> {
  pub(crate) fn into_vec(self) -> Vec<T> {
    match self {
      OneOrMany::Many(items) => items,
      OneOrMany::One(item) => vec![item],
    }
  }
}

/// 托管推理服务客户端
///
/// 模型在服务端按需加载；服务返回 503 时按其给出的预计时间等待后重试。
#[derive(Debug, Clone)]
pub struct HubClient {
  http: Client,
  base: Url,
  token: Option<String>,
  max_retries: u32,
  max_wait: Duration,
}

impl FromUrlWithScheme for HubClient {
  const SCHEME: &'static str = "hf";
}

impl FromUrl for HubClient {
  type Error = HubError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let base = match url.scheme() {
      Self::SCHEME => {
        let host = url
          .host_str()
          .filter(|host| !host.is_empty())
          .unwrap_or(HF_DEFAULT_HOST);
        let prefix = url.path().trim_matches('/');
        let mut base = format!("https://{}/", host);
        if !prefix.is_empty() {
          base.push_str(prefix);
          base.push('/');
        }
        base.push_str("models/");
        Url::parse(&base)?
      }
      "http" | "https" => {
        let mut base = url.clone();
        if !base.path().ends_with('/') {
          let path = format!("{}/", base.path());
          base.set_path(&path);
        }
        base
      }
      other => {
        return Err(HubError::SchemeMismatch(format!(
          "期望 '{}'、'http' 或 'https'，实际为 '{}'",
          Self::SCHEME,
          other
        )));
      }
    };

    HubClient::new(base)
  }
}

impl HubClient {
  pub fn new(base: Url) -> Result<Self, HubError> {
    let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    info!("推理服务地址: {}", base);
    Ok(HubClient {
      http,
      base,
      token: None,
      max_retries: DEFAULT_MAX_RETRIES,
      max_wait: DEFAULT_MAX_WAIT,
    })
  }

  pub fn token(mut self, token: Option<String>) -> Self {
    self.token = token.filter(|token| !token.trim().is_empty());
    self
  }

  pub fn max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  pub fn max_wait(mut self, max_wait: Duration) -> Self {
    self.max_wait = max_wait;
    self
  }

  pub fn base(&self) -> &Url {
    &self.base
  }

  pub fn endpoint(&self, repo_id: &str) -> Result<Url, HubError> {
    Ok(self.base.join(repo_id.trim_matches('/'))?)
  }

  /// 发送 JSON 请求并解析响应
  pub fn post_json<T: DeserializeOwned>(&self, repo_id: &str, body: &Value) -> Result<T, HubError> {
    let url = self.endpoint(repo_id)?;
    let mut payload = body.clone();
    if let Value::Object(map) = &mut payload {
      map.insert("options".to_string(), json!({ "wait_for_model": true }));
    }

    let mut attempts = 0;
    loop {
      attempts += 1;
      let now = Instant::now();
      let mut request = self.http.post(url.clone()).json(&payload);
      if let Some(token) = &self.token {
        request = request.bearer_auth(token);
      }
      let response = request.send()?;
      let status = response.status();
      let text = response.text()?;
      debug!(
        "模型 {} 第 {} 次请求: {} | 耗时: {:.2?}",
        repo_id,
        attempts,
        status,
        now.elapsed()
      );

      if status.is_success() {
        return Ok(serde_json::from_str(&text)?);
      }

      let detail = serde_json::from_str::<ErrorBody>(&text).ok();
      if status == StatusCode::SERVICE_UNAVAILABLE {
        if attempts > self.max_retries {
          return Err(HubError::ModelLoading {
            model: repo_id.to_string(),
            attempts,
          });
        }
        let wait = detail
          .as_ref()
          .and_then(|detail| detail.estimated_time)
          .filter(|secs| secs.is_finite() && *secs >= 0.0)
          .map(Duration::from_secs_f64)
          .unwrap_or(FALLBACK_WAIT)
          .min(self.max_wait);
        warn!("模型 {} 正在加载，{:.1?} 后重试", repo_id, wait);
        thread::sleep(wait);
        continue;
      }

      let message = detail
        .and_then(|detail| detail.message())
        .unwrap_or(text);
      return Err(HubError::Status {
        status: status.as_u16(),
        message,
      });
    }
  }
}
