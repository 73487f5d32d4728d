//! The `EpgSource` trait.
//!
//! The refresh coordinator only needs "give me the guide"; this trait is
//! that seam. [`TvhClient`](crate::TvhClient) is the production
//! implementation, tests plug in scripted sources.

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};
use tvhepg_core::EpgEvent;

use crate::error::ApiResult;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can produce program guide entries.
pub trait EpgSource: Send + Sync {
    /// Short name used in logs (usually the server host).
    fn name(&self) -> &str;

    /// Fetches at most `limit` guide entries, in server order.
    fn fetch_epg(&self, limit: usize) -> BoxFuture<'_, ApiResult<Vec<EpgEvent>>>;

    /// Fetches server metadata. Used to probe connectivity and credentials.
    fn server_info(&self) -> BoxFuture<'_, ApiResult<Map<String, Value>>>;
}
