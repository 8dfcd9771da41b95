/// Byte order of the values stored in a buffer.
/// Most formats we read are little-endian; Blender records the order in its file header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

pub trait ConfigType {
    fn default()-> Self;
}

/// A fixed-size value that can be decoded from raw bytes.
/// `SIZE` is never zero, so element counts derived from byte lengths cannot divide by zero.
pub trait Element: Copy + Sized {
    const SIZE: usize;

    /// Decodes one value from `bytes`.
    /// `bytes` must be exactly `Self::SIZE` long; callers in this crate guarantee it
    /// through the bounds checks of `ByteView`.
    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
                    let mut raw = [0_u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    match endianness {
                        Endianness::Little => <$t>::from_le_bytes(raw),
                        Endianness::Big => <$t>::from_be_bytes(raw),
                    }
                }
            }
        )*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl<T: Element + Default, const N: usize> Element for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
        let mut out = [T::default(); N];
        for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
            *value = T::from_bytes(chunk, endianness);
        }
        out
    }
}
