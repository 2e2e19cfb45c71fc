//! Key-value sinks used by the publisher consumer

mod memory;
mod resp;

pub use memory::MemorySink;
pub use resp::RespSink;

use crate::SinkError;

/// Write-only key-value store
///
/// The publisher calls [`KeyValueSink::set`] once per metric per frame.
/// Connection handling and retries are up to the implementation.
#[async_trait::async_trait]
pub trait KeyValueSink: Send + Sync + 'static {
    async fn set(&self, key: &str, value: &str) -> Result<(), SinkError>;
}

#[async_trait::async_trait]
impl<T: KeyValueSink + ?Sized> KeyValueSink for std::sync::Arc<T> {
    async fn set(&self, key: &str, value: &str) -> Result<(), SinkError> {
        (**self).set(key, value).await
    }
}
