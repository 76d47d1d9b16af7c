//! The contract between the fetcher and whatever moves bytes.

use super::types::{Method, Payload, Response};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Performs one HTTP exchange
///
/// Implementations decide about retries and archiving; callers see either a
/// successful response or an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, method: Method, payload: Option<&Payload>)
        -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn fetch(
        &self,
        url: &str,
        method: Method,
        payload: Option<&Payload>,
    ) -> Result<Response> {
        (**self).fetch(url, method, payload).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch(
        &self,
        url: &str,
        method: Method,
        payload: Option<&Payload>,
    ) -> Result<Response> {
        (**self).fetch(url, method, payload).await
    }
}
