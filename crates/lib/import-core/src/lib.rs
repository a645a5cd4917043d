//! Destination mail store import interface.

use std::future::Future;

/// Boxed error carried by [`ImportError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Acknowledgement of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAck {
    /// Identifier the destination store assigned to the message.
    pub id: String,
}

/// Import failure.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The failure may go away on its own (network, throttling, server fault).
    #[error("transient import failure: {0}")]
    Transient(#[source] BoxError),

    /// The destination rejected the message or the request.
    #[error("permanent import failure: {0}")]
    Permanent(#[source] BoxError),
}

impl ImportError {
    /// Whether the failure is transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Imports raw messages into the destination store.
pub trait Importer: Send + Sync {
    /// Import one raw RFC 822 message.
    fn import<'a>(
        &'a self,
        raw: &'a [u8],
    ) -> impl Future<Output = Result<ImportAck, ImportError>> + Send + 'a;
}

impl<T: Importer> Importer for std::sync::Arc<T> {
    fn import<'a>(
        &'a self,
        raw: &'a [u8],
    ) -> impl Future<Output = Result<ImportAck, ImportError>> + Send + 'a {
        T::import(self, raw)
    }
}
