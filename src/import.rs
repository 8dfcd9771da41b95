use thiserror::Error;

use crate::codec::base64;
use crate::core::byte_view;
use crate::formats::gltf;
use crate::registry;

#[remain::sorted]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Base64 decoding error: {0}")]
    Base64(#[from] base64::Err),
    #[error("Byte view error: {0}")]
    ByteView(#[from] byte_view::Err),
    #[error("glTF buffer error: {0}")]
    Gltf(#[from] gltf::Err),
    #[error("Type dispatch error: {0}")]
    Registry(#[from] registry::Err),
}

/// A failure of an importer, tagged with the part of the asset it was reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to import {context}: {source}")]
pub struct ImportError {
    context: String,
    #[source]
    source: Err,
}

impl ImportError {
    pub fn new(context: impl Into<String>, err: impl Into<Err>) -> Self {
        let context = context.into();
        let source = err.into();
        tracing::warn!(%context, error = %source, "import failed");
        ImportError { context, source }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn kind(&self) -> &Err {
        &self.source
    }
}

/// Attaches import context to the errors of the substrate.
pub trait WithContext<T> {
    fn with_context<F: FnOnce() -> String>(self, context: F) -> Result<T, ImportError>;
}

impl<T, E: Into<Err>> WithContext<T> for Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, context: F) -> Result<T, ImportError> {
        self.map_err(|err| ImportError::new(context(), err))
    }
}
