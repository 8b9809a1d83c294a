//! The client's view of the server.
//!
//! [`ServerConnection`] is the seam a network transport would implement.
//! [`LocalConnection`] calls an in-process [`Server`] on the blocking pool,
//! since answering a homomorphic query is CPU-bound.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use murmur_server::{Server, ServerError};
use murmur_types::wire::{
    AddAsyncInvitationRequest, GetAsyncInvitationsRequest, GetAsyncInvitationsResponse,
    ReceiveMessageRequest, ReceiveMessageResponse, RegisterRequest, RegisterResponse,
    SendMessageRequest, SendMessageResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("server rejected request: {0}")]
    Server(#[from] ServerError),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server task failed: {0}")]
    Task(String),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;

pub trait ServerConnection: Send + Sync {
    fn register(
        &self,
        req: RegisterRequest,
    ) -> impl Future<Output = RpcResult<RegisterResponse>> + Send;

    fn send_message(
        &self,
        req: SendMessageRequest,
    ) -> impl Future<Output = RpcResult<SendMessageResponse>> + Send;

    fn receive_message(
        &self,
        req: ReceiveMessageRequest,
    ) -> impl Future<Output = RpcResult<ReceiveMessageResponse>> + Send;

    fn add_async_invitation(
        &self,
        req: AddAsyncInvitationRequest,
    ) -> impl Future<Output = RpcResult<()>> + Send;

    fn get_async_invitations(
        &self,
        req: GetAsyncInvitationsRequest,
    ) -> impl Future<Output = RpcResult<GetAsyncInvitationsResponse>> + Send;
}

/// In-process connection with a per-call deadline.
#[derive(Clone)]
pub struct LocalConnection {
    server: Arc<Server>,
    timeout: Duration,
}

impl LocalConnection {
    pub fn new(server: Arc<Server>, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// Run `f` on the blocking pool, giving up after the configured timeout.
    ///
    /// A timeout only abandons the result. Blocking tasks cannot be
    /// cancelled, so `f` still runs to completion in the background and
    /// its effect on the server stays applied.
    async fn call<T, F>(&self, f: F) -> RpcResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Server) -> Result<T, ServerError> + Send + 'static,
    {
        let server = Arc::clone(&self.server);
        let task = tokio::task::spawn_blocking(move || f(&server));
        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(RpcError::Timeout(self.timeout)),
            Ok(Err(join)) => Err(RpcError::Task(join.to_string())),
            Ok(Ok(result)) => Ok(result?),
        }
    }
}

impl ServerConnection for LocalConnection {
    async fn register(&self, req: RegisterRequest) -> RpcResult<RegisterResponse> {
        self.call(move |s| s.register(req)).await
    }

    async fn send_message(&self, req: SendMessageRequest) -> RpcResult<SendMessageResponse> {
        self.call(move |s| s.send_message(req)).await
    }

    async fn receive_message(
        &self,
        req: ReceiveMessageRequest,
    ) -> RpcResult<ReceiveMessageResponse> {
        self.call(move |s| s.receive_message(req)).await
    }

    async fn add_async_invitation(&self, req: AddAsyncInvitationRequest) -> RpcResult<()> {
        self.call(move |s| s.add_async_invitation(req)).await
    }

    async fn get_async_invitations(
        &self,
        req: GetAsyncInvitationsRequest,
    ) -> RpcResult<GetAsyncInvitationsResponse> {
        self.call(move |s| s.get_async_invitations(req)).await
    }
}
