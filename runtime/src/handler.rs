//! Event handler trait.
//!
//! An [`EventHandler`] is the only piece of application logic an
//! [`EventConsumer`](crate::EventConsumer) needs. The consumer owns the
//! subscription, reconnection and shutdown; the handler decodes one record and
//! acts on it.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//!
//! struct PrintHandler;
//!
//! #[async_trait]
//! impl EventHandler for PrintHandler {
//!     async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
//!         let value: serde_json::Value = record.decode_json()?;
//!         println!("{value}");
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use order_stream_core::EventRecord;

/// Error type returned by handlers.
///
/// Handler errors are logged by the consumer and never stop it.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Processes records delivered by an [`EventConsumer`](crate::EventConsumer).
///
/// Implementors must be `Send + Sync + 'static` because handlers are shared
/// across async tasks.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handle one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is malformed or processing fails. The
    /// consumer logs it and moves on to the next record.
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError>;
}
