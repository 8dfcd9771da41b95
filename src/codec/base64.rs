//! Base64 (RFC 4648, standard alphabet, `=` padding) for binary payloads embedded
//! in text formats: glTF and USD data URIs, ASCII FBX property blocks.

use crate::core::shared::ConfigType;

use ::base64::{engine::general_purpose::STANDARD, DecodeError, Engine};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const PAD: u8 = b'=';

/// Marks a byte that is not part of the alphabet in `DECODE_TABLE`.
const INVALID: u8 = 0xFF;

/// Maps an ASCII byte to its 6-bit value, or to `INVALID`. Only the lenient decoder uses it.
const DECODE_TABLE: [u8; 128] = {
    let mut table = [INVALID; 128];
    let mut i = 0;
    while i < 64 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// How out-of-alphabet input is treated when decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphabetCheck {
    /// Rejects any byte outside the alphabet, any `=` that is not trailing padding,
    /// and a last symbol carrying bits the output does not use.
    Strict,
    /// Decodes any byte outside the alphabet as the value 0 and lets `=` in the
    /// last group drop the bytes it covers.
    /// Some exporters emit slightly broken payloads that older importers accepted this way.
    Lenient,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub alphabet_check: AlphabetCheck,
}

impl ConfigType for Config {
    fn default() -> Self {
        Self { alphabet_check: AlphabetCheck::Strict }
    }
}

/// Returns the length of the encoding of `len` bytes, i.e. '4 * ceil(len / 3)'.
/// Returns `None` if that does not fit in `usize`.
pub fn encoded_len(len: usize) -> Option<usize> {
    ::base64::encoded_len(len, true)
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Appends the encoding of `bytes` to `out`.
pub fn encode_into(bytes: &[u8], out: &mut String) {
    STANDARD.encode_string(bytes, out);
}

/// Returns the number of bytes `text` decodes to: 'len * 3 / 4' minus the trailing padding.
pub fn decoded_len(text: &[u8]) -> Result<usize, Err> {
    let len = text.len();
    if len % 4 != 0 {
        return Err(Err::InvalidLength { len });
    }
    if len < 4 {
        return Ok(0);
    }
    let padding = text[len - 2..].iter().filter(|&&c| c == PAD).count();
    // A lone '=' before a data character is not padding; only trailing runs count.
    let padding = if text[len - 1] == PAD { padding } else { 0 };
    Ok(len / 4 * 3 - padding)
}

/// Decodes `text` with the default (strict) configuration.
pub fn decode(text: impl AsRef<[u8]>) -> Result<Vec<u8>, Err> {
    decode_with(text.as_ref(), &Config::default())
}

pub fn decode_with(text: &[u8], cfg: &Config) -> Result<Vec<u8>, Err> {
    let out_len = decoded_len(text)?;
    match cfg.alphabet_check {
        AlphabetCheck::Strict => STANDARD.decode(text).map_err(|err| Err::from_decode_error(err, text)),
        AlphabetCheck::Lenient => Ok(decode_lenient(text, out_len)),
    }
}

/// 'text.len()' must be a multiple of 4.
fn decode_lenient(text: &[u8], out_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(out_len);
    if text.len() < 4 {
        return out;
    }

    let (body, last) = text.split_at(text.len() - 4);
    for group in body.chunks_exact(4) {
        let [b0, b1, b2, b3] = [group[0], group[1], group[2], group[3]].map(lenient_value);
        out.push(b0 << 2 | b1 >> 4);
        out.push(b1 << 4 | b2 >> 2);
        out.push(b2 << 6 | b3);
    }

    let b0 = lenient_value(last[0]);
    let b1 = lenient_value(last[1]);
    // A '=' followed by data ends the output early,
    // so the result may be shorter than 'out_len'.
    let b2 = (last[2] != PAD).then(|| lenient_value(last[2]));
    let b3 = (last[3] != PAD).then(|| lenient_value(last[3]));

    out.push(b0 << 2 | b1 >> 4);
    if let Some(b2) = b2 {
        out.push(b1 << 4 | b2 >> 2);
        if let Some(b3) = b3 {
            out.push(b2 << 6 | b3);
        }
    }
    out
}

#[inline]
fn lenient_value(c: u8) -> u8 {
    match DECODE_TABLE.get(c as usize) {
        Some(&v) if v != INVALID => v,
        _ => 0,
    }
}

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Err {
    #[error("Byte 0x{byte:02x} at position {position} is not a base64 character")]
    InvalidCharacter { byte: u8, position: usize },
    #[error("Last symbol 0x{byte:02x} at position {position} carries bits the output does not use")]
    InvalidLastSymbol { byte: u8, position: usize },
    #[error("Base64 text of length {len} is not a multiple of 4")]
    InvalidLength { len: usize },
    #[error("Padding character at position {position} is not at the end of the text")]
    MisplacedPadding { position: usize },
}

impl Err {
    fn from_decode_error(err: DecodeError, text: &[u8]) -> Self {
        match err {
            DecodeError::InvalidByte(position, PAD) => Err::MisplacedPadding { position },
            DecodeError::InvalidByte(position, byte) => Err::InvalidCharacter { byte, position },
            DecodeError::InvalidLastSymbol(position, byte) => Err::InvalidLastSymbol { byte, position },
            DecodeError::InvalidLength => Err::InvalidLength { len: text.len() },
            DecodeError::InvalidPadding => Err::MisplacedPadding {
                position: text.iter().position(|&c| c == PAD).unwrap_or(text.len()),
            },
        }
    }

    /// Every base64 failure means the encoded text itself is malformed.
    pub fn is_malformed_encoding(&self) -> bool {
        matches!(
            self,
            Err::InvalidCharacter { .. }
                | Err::InvalidLastSymbol { .. }
                | Err::InvalidLength { .. }
                | Err::MisplacedPadding { .. }
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn lenient() -> Config {
        Config { alphabet_check: AlphabetCheck::Lenient }
    }

    #[test]
    fn padding() {
        assert_eq!(encode(&[]), "");
        assert_eq!(encode(&[0x4D]), "TQ==");
        assert_eq!(encode(&[0x4D, 0x61]), "TWE=");
        assert_eq!(encode(&[0x4D, 0x61, 0x6E]), "TWFu");
        assert_eq!(encode(b"Man is"), "TWFuIGlz");
    }

    #[test]
    fn seven_bytes() {
        let bytes = [1_u8, 2, 3, 4, 5, 6, 7];
        let text = encode(&bytes);
        assert_eq!(text, "AQIDBAUGBw==");
        assert_eq!(decode(&text).unwrap(), bytes);
    }

    #[test]
    fn encode_appends() {
        let mut uri = String::from("data:application/octet-stream;base64,");
        encode_into(&[0xFF, 0xFE], &mut uri);
        assert_eq!(uri, "data:application/octet-stream;base64,//4=");
    }

    #[test]
    fn decode_lengths() {
        assert_eq!(decoded_len(b"").unwrap(), 0);
        assert_eq!(decoded_len(b"TQ==").unwrap(), 1);
        assert_eq!(decoded_len(b"TWE=").unwrap(), 2);
        assert_eq!(decoded_len(b"TWFu").unwrap(), 3);
        assert_eq!(decoded_len(b"TWFuTQ==").unwrap(), 4);
        assert_eq!(decoded_len(b"AQI"), Err(Err::InvalidLength { len: 3 }));
    }

    #[test]
    fn malformed_length() {
        let err = decode("AQI").unwrap_err();
        assert_eq!(err, Err::InvalidLength { len: 3 });
        assert!(err.is_malformed_encoding());
        assert!(decode("TWFuT").is_err());
        assert!(decode_with(b"AQI", &lenient()).is_err());
    }

    #[test]
    fn empty_and_short() {
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn invalid_characters() {
        assert_eq!(
            decode("TW*u"),
            Err(Err::InvalidCharacter { byte: b'*', position: 2 })
        );
        assert_eq!(
            decode("TWFuT\u{e9}="),
            Err(Err::InvalidCharacter { byte: 0xC3, position: 5 })
        );
        assert_eq!(
            decode("TWFu TQ="),
            Err(Err::InvalidCharacter { byte: b' ', position: 4 })
        );
    }

    #[test]
    fn misplaced_padding() {
        assert_eq!(decode("TQ==TQ=="), Err(Err::MisplacedPadding { position: 2 }));
        assert_eq!(decode("TQ=A"), Err(Err::MisplacedPadding { position: 2 }));
        assert_eq!(decode("T==="), Err(Err::MisplacedPadding { position: 1 }));
        assert_eq!(decode("===="), Err(Err::MisplacedPadding { position: 0 }));
    }

    #[test]
    fn unused_trailing_bits() {
        assert_eq!(decode("TQ=="), Ok(vec![0x4D]));
        let err = decode("TR==").unwrap_err();
        assert_eq!(err, Err::InvalidLastSymbol { byte: b'R', position: 1 });
        assert!(err.is_malformed_encoding());
        assert_eq!(decode("TWF="), Err(Err::InvalidLastSymbol { byte: b'F', position: 2 }));
        assert_eq!(decode_with(b"TR==", &lenient()), Ok(vec![0x4D]));
    }

    #[test]
    fn lenient_decoding() {
        // '*' decodes like 'A'.
        assert_eq!(decode_with(b"TW*u", &lenient()).unwrap(), decode("TWAu").unwrap());
        // non-ASCII bytes decode as 0 instead of indexing past the table.
        assert_eq!(decode_with(&[b'T', b'W', 0xC3, b'u'], &lenient()).unwrap(), decode("TWAu").unwrap());
        assert_eq!(decode_with(b"TQ==", &lenient()).unwrap(), vec![0x4D]);
        assert_eq!(decode_with(b"TQ=A", &lenient()).unwrap(), vec![0x4D]);
    }

    #[test]
    fn binary_roundtrip() {
        let bytes: Vec<u8> = (0..=255).collect();
        for len in 0..bytes.len() {
            let text = encode(&bytes[..len]);
            assert_eq!(text.len(), encoded_len(len).unwrap());
            assert_eq!(decode(&text).unwrap(), &bytes[..len]);
        }
    }
}
