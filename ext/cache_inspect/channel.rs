// Copyright 2018-2026 the Deno authors. MIT license.

use deno_error::JsErrorClass;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::AggregateResult;
use crate::Enumerator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CacheRequest {
  GetCaches { origin: String },
  ExportCaches { origin: String },
  GetStorageData { origin: String },
}

impl CacheRequest {
  pub fn origin(&self) -> &str {
    match self {
      Self::GetCaches { origin }
      | Self::ExportCaches { origin }
      | Self::GetStorageData { origin } => origin,
    }
  }

  pub fn action(&self) -> &'static str {
    match self {
      Self::GetCaches { .. } => "getCaches",
      Self::ExportCaches { .. } => "exportCaches",
      Self::GetStorageData { .. } => "getStorageData",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
  pub class: String,
  pub message: String,
}

impl ErrorInfo {
  pub fn from_error(err: &dyn JsErrorClass) -> Self {
    Self {
      class: err.get_class().into_owned(),
      message: err.get_message().into_owned(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheResponse {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<AggregateResult>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<ErrorInfo>,
}

impl CacheResponse {
  pub fn ok(data: AggregateResult) -> Self {
    Self {
      success: true,
      data: Some(data),
      error: None,
    }
  }

  pub fn err(err: &dyn JsErrorClass) -> Self {
    Self {
      success: false,
      data: None,
      error: Some(ErrorInfo::from_error(err)),
    }
  }

  pub fn into_result(self) -> Result<AggregateResult, ErrorInfo> {
    match (self.success, self.data, self.error) {
      (true, data, _) => Ok(data.unwrap_or_default()),
      (false, _, Some(error)) => Err(error),
      (false, _, None) => Err(ErrorInfo {
        class: "Error".to_string(),
        message: "Unknown error".to_string(),
      }),
    }
  }
}

#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum ChannelError {
  #[class(generic)]
  #[error("Could not establish connection. Receiving end does not exist.")]
  Closed,
}

struct Envelope {
  request: CacheRequest,
  responder: Responder,
}

/// Answers exactly one request. The handler may hold on to it and reply
/// whenever its work completes.
pub struct Responder(oneshot::Sender<CacheResponse>);

impl Responder {
  pub fn send(self, response: CacheResponse) {
    if self.0.send(response).is_err() {
      log::debug!("Requester went away before the response arrived");
    }
  }
}

#[derive(Clone)]
pub struct MessageSender(mpsc::UnboundedSender<Envelope>);

impl MessageSender {
  pub async fn send_message(
    &self,
    request: CacheRequest,
  ) -> Result<CacheResponse, ChannelError> {
    let (tx, rx) = oneshot::channel();
    self
      .0
      .send(Envelope {
        request,
        responder: Responder(tx),
      })
      .map_err(|_| ChannelError::Closed)?;
    rx.await.map_err(|_| ChannelError::Closed)
  }
}

pub struct MessageReceiver(mpsc::UnboundedReceiver<Envelope>);

impl MessageReceiver {
  pub async fn recv(&mut self) -> Option<(CacheRequest, Responder)> {
    let envelope = self.0.recv().await?;
    Some((envelope.request, envelope.responder))
  }
}

pub fn message_channel() -> (MessageSender, MessageReceiver) {
  let (tx, rx) = mpsc::unbounded_channel();
  (MessageSender(tx), MessageReceiver(rx))
}

/// Serves cache requests for the presenter.
#[derive(Clone)]
pub struct BackgroundService {
  enumerator: Enumerator,
}

impl BackgroundService {
  pub fn new(enumerator: Enumerator) -> Self {
    Self { enumerator }
  }

  /// Start serving on a fresh channel and return its sending half.
  pub fn spawn(self) -> (MessageSender, tokio::task::JoinHandle<()>) {
    let (sender, receiver) = message_channel();
    let handle = tokio::spawn(self.run(receiver));
    (sender, handle)
  }

  pub async fn handle(&self, request: CacheRequest) -> CacheResponse {
    match self.enumerator.enumerate(request.origin()).await {
      Ok(data) => CacheResponse::ok(data),
      Err(err) => CacheResponse::err(&err),
    }
  }

  /// Serve until every sender is dropped. Each request is answered from its
  /// own task.
  pub async fn run(self, mut receiver: MessageReceiver) {
    while let Some((request, responder)) = receiver.recv().await {
      log::debug!(
        "Received {} request for {}",
        request.action(),
        request.origin()
      );
      let service = self.clone();
      tokio::spawn(async move {
        let response = service.handle(request).await;
        responder.send(response);
      });
    }
    log::debug!("Message channel closed, stopping background service");
  }
}
