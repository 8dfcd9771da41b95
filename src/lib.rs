// lib.rs

/// Contains the byte view, its readers and the element definitions shared by every module.
pub mod core;

/// Contains the base64 codec and `data:` URI handling.
pub mod codec;

/// Defines the tag-to-decoder dispatch table used by format readers.
pub mod registry;

/// Contains the format layers built on the substrate.
pub mod formats;

/// Defines the error type returned by importers.
pub mod import;

pub mod prelude {
    pub use crate::core::byte_view::{ByteView, Elements, ViewReader};
    pub use crate::core::shared::{ConfigType, Element, Endianness};
    pub use crate::codec::{base64, data_uri::DataUri};
    pub use crate::registry::{Decodable, DecodedBuffer, Entry, TypeTag, TypeTagRegistry};
    pub use crate::import::{ImportError, WithContext};
}
