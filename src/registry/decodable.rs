use crate::core::{
    byte_view::{self, ViewReader},
    shared::Element,
};

/// An element type the registry can materialize from a byte stream.
///
/// `SIZE` is the number of bytes one call to `decode` consumes; the registry
/// relies on it to reject element counts the source cannot hold before it
/// allocates, and checks it after each decode.
pub trait Decodable: Sized + Send + Sync + 'static {
    const SIZE: usize;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr>;
}

impl<T: Element + Send + Sync + 'static> Decodable for T {
    const SIZE: usize = <T as Element>::SIZE;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        Ok(reader.read::<T>()?)
    }
}

/// Failure of a single per-type decode routine.
#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErr {
    #[error("Inconsistent record: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    OutOfRange(#[from] byte_view::Err),
}
