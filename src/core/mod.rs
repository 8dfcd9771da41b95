/// Bounds-checked views over raw file bytes.
pub mod byte_view;

/// Contains the element definitions shared by the views, the codecs and the registry.
pub mod shared;
