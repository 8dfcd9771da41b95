use std::borrow::Cow;

use super::base64;

const SCHEME: &str = "data:";

/// A parsed `data:` URI (RFC 2397), borrowing from the URI text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub media_type: &'a str,
    pub charset: &'a str,
    pub base64: bool,
    /// The payload after the first ','; still base64-encoded when `base64` is set.
    pub data: &'a str,
}

impl<'a> DataUri<'a> {
    /// Parses `uri`, or returns `None` when it is not a data URI.
    /// A URI without a ',' has no parameters; everything after `data:` is the payload.
    pub fn parse(uri: &'a str) -> Option<Self> {
        let rest = uri.get(..SCHEME.len())
            .filter(|scheme| scheme.eq_ignore_ascii_case(SCHEME))
            .map(|_| &uri[SCHEME.len()..])?;

        let (header, data) = match rest.split_once(',') {
            Some((header, data)) => (header, data),
            None => ("", rest),
        };

        let mut params = header.split(';');
        let media_type = params.next().filter(|m| !m.is_empty()).unwrap_or("text/plain");
        let mut out = DataUri { media_type, charset: "US-ASCII", base64: false, data };
        for param in params {
            if let Some(charset) = param.strip_prefix("charset=") {
                out.charset = charset;
            } else if param == "base64" {
                out.base64 = true;
            }
        }
        Some(out)
    }

    /// Returns the payload bytes, decoding base64 when the URI says so.
    pub fn decode(&self, cfg: &base64::Config) -> Result<Cow<'a, [u8]>, base64::Err> {
        if self.base64 {
            base64::decode_with(self.data.as_bytes(), cfg).map(Cow::Owned)
        } else {
            Ok(Cow::Borrowed(self.data.as_bytes()))
        }
    }

    /// Builds a base64 data URI; an empty media type becomes `application/octet-stream`.
    pub fn encode(media_type: &str, bytes: &[u8]) -> String {
        let media_type = if media_type.is_empty() { "application/octet-stream" } else { media_type };
        let mut uri = format!("{}{};base64,", SCHEME, media_type);
        base64::encode_into(bytes, &mut uri);
        uri
    }
}

pub fn is_data_uri(uri: &str) -> bool {
    DataUri::parse(uri).is_some()
}
