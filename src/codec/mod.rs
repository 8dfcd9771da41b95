/// Base64 encoding and decoding shared by every text-based format.
pub mod base64;

/// Parsing and building of `data:` URIs carrying inline payloads.
pub mod data_uri;
