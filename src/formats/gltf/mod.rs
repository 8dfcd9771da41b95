use crate::codec::{base64, data_uri::DataUri};
use crate::core::byte_view::{self, ByteView};
use crate::core::shared::{ConfigType, Element};

#[derive(Clone, Debug)]
pub struct Config {
    pub base64: base64::Config,
    /// Rejects buffers whose payload length differs from their `byteLength`.
    pub require_stated_length: bool,
}

impl ConfigType for Config {
    fn default() -> Self {
        Config {
            base64: base64::Config::default(),
            require_stated_length: true,
        }
    }
}

/// A loaded glTF buffer. Embedded payloads are decoded once and owned by the buffer.
#[derive(Debug)]
pub struct Buffer {
    pub id: String,
    pub data: ByteView<'static>,
}

impl Buffer {
    /// Loads a buffer from its `uri` and stated `byteLength`.
    ///
    /// Only `data:` URIs are resolved here; external files are reported with
    /// [`Err::ExternalUri`] so the caller can load them through its own IO.
    pub fn from_uri(id: &str, uri: Option<&str>, stated_len: usize, cfg: &Config) -> Result<Self, Err> {
        let Some(uri) = uri else {
            if stated_len > 0 {
                return Err(Err::MissingUri { id: id.to_string() });
            }
            return Ok(Buffer { id: id.to_string(), data: ByteView::default() });
        };

        let data_uri = DataUri::parse(uri).ok_or_else(|| Err::ExternalUri {
            id: id.to_string(),
            uri: uri.to_string(),
        })?;
        let payload = data_uri.decode(&cfg.base64)?;
        tracing::debug!(
            buffer = id,
            media_type = data_uri.media_type,
            base64 = data_uri.base64,
            len = payload.len(),
            "loaded embedded buffer"
        );

        // A zero byteLength leaves the length of a base64 payload unchecked.
        let stated = stated_len > 0 || !data_uri.base64;
        if stated && payload.len() != stated_len {
            if cfg.require_stated_length {
                return Err(Err::LengthMismatch {
                    id: id.to_string(),
                    expected: stated_len,
                    found: payload.len(),
                });
            }
            tracing::warn!(buffer = id, stated_len, found = payload.len(), "buffer length differs from byteLength");
        }

        Ok(Buffer {
            id: id.to_string(),
            data: ByteView::owning(payload.into_owned()),
        })
    }

    /// Wraps bytes the caller has loaded itself (a GLB chunk or an external file).
    pub fn from_bytes(id: &str, bytes: Vec<u8>) -> Self {
        Buffer { id: id.to_string(), data: ByteView::owning(bytes) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The location of an accessor's elements inside a buffer, with any buffer view offset already applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accessor {
    pub byte_offset: usize,
    pub count: usize,
    /// Distance between consecutive elements; tightly packed when `None`.
    pub byte_stride: Option<usize>,
}

impl Accessor {
    pub fn extract<T: Element>(&self, buffer: &Buffer) -> Result<Vec<T>, Err> {
        let stride = self.byte_stride.unwrap_or(T::SIZE);
        let elements = buffer.data.get_strided::<T>(self.byte_offset, self.count, stride)?;
        tracing::trace!(buffer = buffer.id.as_str(), count = self.count, stride, "extracting accessor");
        Ok(elements.to_vec())
    }
}

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::Err),
    #[error("Buffer '{id}' refers to the external resource '{uri}'")]
    ExternalUri { id: String, uri: String },
    #[error("Accessor does not fit its buffer: {0}")]
    Layout(#[from] byte_view::Err),
    #[error("Buffer '{id}' has {found} bytes but states byteLength {expected}")]
    LengthMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
    #[error("Buffer '{id}' has a byteLength but no uri")]
    MissingUri { id: String },
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_buffer() {
        let buffer = Buffer::from_uri(
            "0",
            Some("data:application/octet-stream;base64,AAAAAAAAgD8AAABA"),
            12,
            &Config::default(),
        )
        .unwrap();
        assert_eq!(buffer.len(), 12);
        assert!(buffer.data.is_owned());
        let accessor = Accessor { byte_offset: 4, count: 2, byte_stride: None };
        assert_eq!(accessor.extract::<f32>(&buffer).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn raw_payload_is_copied() {
        let buffer = Buffer::from_uri("text", Some("data:,abc"), 3, &Config::default()).unwrap();
        assert_eq!(buffer.data.as_bytes(), b"abc");
    }

    #[test]
    fn missing_and_external_uri() {
        let cfg = Config::default();
        assert_eq!(
            Buffer::from_uri("a", None, 4, &cfg).unwrap_err(),
            Err::MissingUri { id: "a".to_string() }
        );
        assert!(Buffer::from_uri("a", None, 0, &cfg).unwrap().is_empty());
        assert_eq!(
            Buffer::from_uri("b", Some("mesh.bin"), 4, &cfg).unwrap_err(),
            Err::ExternalUri { id: "b".to_string(), uri: "mesh.bin".to_string() }
        );
    }

    #[test]
    fn stated_length() {
        let uri = Some("data:;base64,AQID");
        let err = Buffer::from_uri("c", uri, 4, &Config::default()).unwrap_err();
        assert_eq!(err, Err::LengthMismatch { id: "c".to_string(), expected: 4, found: 3 });

        let cfg = Config { require_stated_length: false, ..Config::default() };
        assert_eq!(Buffer::from_uri("c", uri, 4, &cfg).unwrap().len(), 3);

        assert_eq!(Buffer::from_uri("c", uri, 0, &Config::default()).unwrap().len(), 3);
        assert!(Buffer::from_uri("raw", Some("data:,abc"), 0, &Config::default()).is_err());
    }

    #[test]
    fn malformed_payload() {
        let err = Buffer::from_uri("d", Some("data:;base64,AQ*D"), 3, &Config::default()).unwrap_err();
        assert_eq!(err, Err::Base64(base64::Err::InvalidCharacter { byte: b'*', position: 2 }));
    }

    #[test]
    fn interleaved_accessor() {
        // position (3 x u16) and one u8 flag per 8-byte vertex
        let mut bytes = Vec::new();
        for v in 0_u16..3 {
            for c in 0..3 {
                bytes.extend_from_slice(&(v * 10 + c).to_le_bytes());
            }
            bytes.extend_from_slice(&[v as u8, 0]);
        }
        let buffer = Buffer::from_bytes("interleaved", bytes);
        let positions = Accessor { byte_offset: 0, count: 3, byte_stride: Some(8) };
        assert_eq!(
            positions.extract::<[u16; 3]>(&buffer).unwrap(),
            vec![[0, 1, 2], [10, 11, 12], [20, 21, 22]]
        );
        let flags = Accessor { byte_offset: 6, count: 3, byte_stride: Some(8) };
        assert_eq!(flags.extract::<u8>(&buffer).unwrap(), vec![0, 1, 2]);

        let past_end = Accessor { byte_offset: 8, count: 3, byte_stride: Some(8) };
        assert!(matches!(past_end.extract::<[u16; 3]>(&buffer), Err(Err::Layout(_))));
        let narrow = Accessor { byte_offset: 0, count: 3, byte_stride: Some(4) };
        assert!(matches!(
            narrow.extract::<[u16; 3]>(&buffer),
            Err(Err::Layout(byte_view::Err::InvalidStride { stride: 4, element_size: 6 }))
        ));
    }
}
