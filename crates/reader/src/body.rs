use std::sync::Arc;

use tokio::sync::Mutex;

use crate::BodyError;

/// A request body that can be read at most once.
///
/// Clones share the same slot, so a handler and its extractors may all hold one while
/// only the first reader gets the transport.
#[derive(Debug)]
pub struct OptionReqBody<B> {
    inner: Arc<Mutex<Option<B>>>,
}

impl<B> Clone for OptionReqBody<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B> From<B> for OptionReqBody<B> {
    fn from(body: B) -> Self {
        OptionReqBody { inner: Arc::new(Mutex::new(Some(body))) }
    }
}

impl<B> OptionReqBody<B> {
    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    /// Takes the transport out, marking the body consumed.
    pub async fn take(&self) -> Result<B, BodyError> {
        let mut guard = self.inner.lock().await;
        guard.take().ok_or(BodyError::AlreadyConsumed)
    }
}
