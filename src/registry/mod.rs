pub mod decodable;

use std::{any::Any, fmt, marker::PhantomData, sync::Arc};

use crate::core::byte_view::{self, ViewReader};
pub use decodable::{DecodeErr, Decodable};

/// A closed set of element types defined by a file format, identified on disk by
/// small integers in `0..COUNT` (or by their names).
pub trait TypeTag: Copy + Eq + fmt::Debug + 'static {
    /// One past the largest valid tag value.
    const COUNT: usize;

    /// The tag value. Always less than `COUNT`.
    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;

    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        (0..Self::COUNT)
            .filter_map(Self::from_index)
            .find(|tag| tag.name() == name)
    }
}

/// Untyped storage handed from an allocate routine to its decode routine.
pub type Storage = Box<dyn Any + Send + Sync>;

pub type AllocateFn = fn(usize) -> Storage;

pub type DecodeFn = fn(&mut Storage, usize, &mut ViewReader<'_>) -> Result<(), DecodeErr>;

#[derive(Clone, Copy)]
struct Routines {
    allocate: AllocateFn,
    decode: DecodeFn,
    element_size: usize,
}

/// One row of a registry: the allocate/decode pair of a tag, or the sentinel
/// of a tag that is recognized but cannot be decoded.
#[derive(Clone, Copy)]
pub struct Entry {
    routines: Option<Routines>,
}

impl Entry {
    pub const UNSUPPORTED: Entry = Entry { routines: None };

    /// The allocate/decode pair producing a `Vec<T>`.
    pub fn supported<T: Decodable>() -> Self {
        Entry {
            routines: Some(Routines {
                allocate: allocate::<T>,
                decode: decode::<T>,
                element_size: T::SIZE,
            }),
        }
    }

    /// Builds an entry from hand-written routines.
    /// `decode` must consume exactly `element_size` bytes per element.
    pub fn from_fns(allocate: AllocateFn, decode: DecodeFn, element_size: usize) -> Self {
        Entry { routines: Some(Routines { allocate, decode, element_size }) }
    }

    pub fn is_supported(&self) -> bool {
        self.routines.is_some()
    }

    pub fn element_size(&self) -> Option<usize> {
        self.routines.map(|r| r.element_size)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.routines {
            Some(r) => write!(f, "Entry(element_size: {})", r.element_size),
            None => write!(f, "Entry(unsupported)"),
        }
    }
}

fn allocate<T: Decodable>(count: usize) -> Storage {
    Box::new(Vec::<T>::with_capacity(count))
}

fn decode<T: Decodable>(storage: &mut Storage, count: usize, reader: &mut ViewReader<'_>) -> Result<(), DecodeErr> {
    let out = storage
        .downcast_mut::<Vec<T>>()
        .ok_or_else(|| DecodeErr::Inconsistent("storage does not hold the element type of its tag".to_string()))?;
    for _ in 0..count {
        out.push(T::decode(reader)?);
    }
    Ok(())
}

/// Elements decoded by a registry, shared read-only between their consumers.
#[derive(Clone)]
pub struct DecodedBuffer {
    tag: usize,
    element_size: usize,
    len: usize,
    data: Arc<dyn Any + Send + Sync>,
}

impl DecodedBuffer {
    /// The tag value the elements were decoded as.
    pub fn tag_index(&self) -> usize {
        self.tag
    }

    /// The number of source bytes per element.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the elements if they were stored as `Vec<T>`.
    pub fn as_slice<T: 'static>(&self) -> Option<&[T]> {
        self.data.downcast_ref::<Vec<T>>().map(Vec::as_slice)
    }

    /// Returns the storage produced by a hand-written allocate routine.
    pub fn downcast_ref<S: 'static>(&self) -> Option<&S> {
        self.data.downcast_ref::<S>()
    }
}

impl fmt::Debug for DecodedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedBuffer")
            .field("tag", &self.tag)
            .field("element_size", &self.element_size)
            .field("len", &self.len)
            .finish()
    }
}

/// A flat table from tag value to `Entry`, indexed in O(1).
///
/// Every tag in `0..Tag::COUNT` has exactly one row; tags without a declared
/// row hold `Entry::UNSUPPORTED`. The table is immutable once built, so a
/// registry in a `lazy_static` can be shared between threads freely.
pub struct TypeTagRegistry<Tag: TypeTag> {
    rows: Box<[Entry]>,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Tag: TypeTag> TypeTagRegistry<Tag> {
    /// Builds the table from a declarative list of rows.
    pub fn build(rows: &[(Tag, Entry)]) -> Result<Self, BuildErr> {
        let mut table: Vec<Option<Entry>> = vec![None; Tag::COUNT];
        for &(tag, entry) in rows {
            let index = tag.index();
            let slot = table.get_mut(index).ok_or(BuildErr::IndexOutOfRange {
                tag: tag.name(),
                index,
                count: Tag::COUNT,
            })?;
            if slot.is_some() {
                return Err(BuildErr::DuplicateTag { tag: tag.name() });
            }
            *slot = Some(entry);
        }
        Ok(Self {
            rows: table.into_iter().map(|e| e.unwrap_or(Entry::UNSUPPORTED)).collect(),
            _tag: PhantomData,
        })
    }

    pub fn is_valid_tag(raw: i64) -> bool {
        usize::try_from(raw).is_ok_and(|index| index < Tag::COUNT)
    }

    /// Resolves a raw tag value read from a file.
    pub fn resolve(raw: i64) -> Result<Tag, Err> {
        let unknown = Err::UnknownTypeTag { tag: raw, count: Tag::COUNT };
        if !Self::is_valid_tag(raw) {
            return Err(unknown);
        }
        usize::try_from(raw).ok().and_then(Tag::from_index).ok_or(unknown)
    }

    pub fn entry(&self, tag: Tag) -> Entry {
        self.rows.get(tag.index()).copied().unwrap_or(Entry::UNSUPPORTED)
    }

    /// Decodes `count` elements of the type identified by the raw tag `raw` from `source`.
    pub fn decode_elements(&self, raw: i64, count: usize, source: &mut ViewReader<'_>) -> Result<DecodedBuffer, Err> {
        let tag = Self::resolve(raw)?;
        self.decode_tag(tag, count, source)
    }

    /// Same as [`TypeTagRegistry::decode_elements`] with the tag given by name.
    pub fn decode_named(&self, name: &str, count: usize, source: &mut ViewReader<'_>) -> Result<DecodedBuffer, Err> {
        let tag = Tag::from_name(name).ok_or_else(|| Err::UnknownTypeName { name: name.to_string() })?;
        self.decode_tag(tag, count, source)
    }

    pub fn decode_tag(&self, tag: Tag, count: usize, source: &mut ViewReader<'_>) -> Result<DecodedBuffer, Err> {
        let routines = self.entry(tag).routines.ok_or(Err::UnsupportedType { tag: tag.name() })?;
        let failed = |err| Err::DecodeFailed { tag: tag.name(), count, source: err };

        // The count comes from the file; make sure the source can hold it before allocating.
        let start = source.position();
        let fits = count
            .checked_mul(routines.element_size)
            .is_some_and(|needed| needed <= source.remaining());
        if !fits {
            return Err(failed(DecodeErr::OutOfRange(byte_view::Err::OutOfRange {
                offset: start,
                count,
                element_size: routines.element_size,
                len: source.len(),
            })));
        }

        // 'storage' is dropped on every early return below, and 'source' only
        // advances once the whole run has decoded.
        let mut storage = (routines.allocate)(count);
        let mut cursor = source.clone();
        (routines.decode)(&mut storage, count, &mut cursor).map_err(failed)?;

        let consumed = cursor.position() - start;
        if consumed != count * routines.element_size {
            return Err(failed(DecodeErr::Inconsistent(format!(
                "consumed {} bytes for {} element(s) of {} bytes",
                consumed, count, routines.element_size
            ))));
        }
        *source = cursor;

        Ok(DecodedBuffer {
            tag: tag.index(),
            element_size: routines.element_size,
            len: count,
            data: Arc::from(storage),
        })
    }
}

impl<Tag: TypeTag> fmt::Debug for TypeTagRegistry<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (index, entry) in self.rows.iter().enumerate() {
            if let Some(tag) = Tag::from_index(index) {
                map.entry(&tag, entry);
            }
        }
        map.finish()
    }
}

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Failed to decode {count} element(s) of type '{tag}'")]
    DecodeFailed {
        tag: &'static str,
        count: usize,
        #[source]
        source: DecodeErr,
    },
    #[error("Type name '{name}' is not known")]
    UnknownTypeName { name: String },
    #[error("Type tag {tag} is outside the valid range 0..{count}")]
    UnknownTypeTag { tag: i64, count: usize },
    #[error("Type '{tag}' is recognized but cannot be decoded")]
    UnsupportedType { tag: &'static str },
}

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildErr {
    #[error("Type '{tag}' has more than one row")]
    DuplicateTag { tag: &'static str },
    #[error("Type '{tag}' reports index {index}, outside 0..{count}")]
    IndexOutOfRange {
        tag: &'static str,
        index: usize,
        count: usize,
    },
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::byte_view::ByteView;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        Byte,
        Float,
        Pair,
        Opaque,
    }

    impl TypeTag for Kind {
        const COUNT: usize = 4;

        fn index(self) -> usize {
            self as usize
        }

        fn from_index(index: usize) -> Option<Self> {
            [Kind::Byte, Kind::Float, Kind::Pair, Kind::Opaque].get(index).copied()
        }

        fn name(self) -> &'static str {
            match self {
                Kind::Byte => "byte",
                Kind::Float => "float",
                Kind::Pair => "pair",
                Kind::Opaque => "opaque",
            }
        }
    }

    fn registry() -> TypeTagRegistry<Kind> {
        TypeTagRegistry::build(&[
            (Kind::Byte, Entry::supported::<u8>()),
            (Kind::Float, Entry::supported::<f32>()),
            (Kind::Pair, Entry::supported::<[u16; 2]>()),
        ])
        .unwrap()
    }

    #[test]
    fn dispatch() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5_f32.to_le_bytes());
        data.extend_from_slice(&(-2.0_f32).to_le_bytes());
        let view = ByteView::owning(data);
        let decoded = registry().decode_elements(1, 2, &mut view.reader()).unwrap();
        assert_eq!(decoded.tag_index(), 1);
        assert_eq!(decoded.element_size(), 4);
        assert_eq!(decoded.as_slice::<f32>(), Some(&[1.5, -2.0][..]));
        assert_eq!(decoded.as_slice::<u8>(), None);
    }

    #[test]
    fn by_name() {
        let data = [1_u8, 0, 2, 0];
        let view = ByteView::view(&data);
        let decoded = registry().decode_named("pair", 1, &mut view.reader()).unwrap();
        assert_eq!(decoded.as_slice::<[u16; 2]>(), Some(&[[1, 2]][..]));
        assert_eq!(
            registry().decode_named("quad", 1, &mut view.reader()).unwrap_err(),
            Err::UnknownTypeName { name: "quad".to_string() }
        );
    }

    #[test]
    fn range_check() {
        let view = ByteView::view(&[0_u8; 8]);
        let registry = registry();
        for raw in [-1, -4, 4, 5, i64::MIN, i64::MAX] {
            assert!(!TypeTagRegistry::<Kind>::is_valid_tag(raw));
            assert_eq!(
                registry.decode_elements(raw, 1, &mut view.reader()).unwrap_err(),
                Err::UnknownTypeTag { tag: raw, count: 4 }
            );
        }
    }

    #[test]
    fn unsupported_row() {
        let view = ByteView::view(&[0_u8; 8]);
        let err = registry().decode_elements(3, 1, &mut view.reader()).unwrap_err();
        assert_eq!(err, Err::UnsupportedType { tag: "opaque" });
        assert!(!registry().entry(Kind::Opaque).is_supported());
    }

    #[test]
    fn count_larger_than_source() {
        let view = ByteView::view(&[0_u8; 7]);
        let mut reader = view.reader();
        let err = registry().decode_elements(1, 2, &mut reader).unwrap_err();
        assert!(matches!(
            err,
            Err::DecodeFailed { tag: "float", count: 2, source: DecodeErr::OutOfRange(_) }
        ));
        assert_eq!(reader.position(), 0);
        assert!(registry().decode_elements(0, usize::MAX, &mut reader).is_err());
    }

    #[test]
    fn zero_elements() {
        let view = ByteView::default();
        let decoded = registry().decode_elements(2, 0, &mut view.reader()).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.as_slice::<[u16; 2]>(), Some(&[][..]));
    }

    #[test]
    fn build_errors() {
        let err = TypeTagRegistry::build(&[
            (Kind::Byte, Entry::supported::<u8>()),
            (Kind::Byte, Entry::UNSUPPORTED),
        ])
        .unwrap_err();
        assert_eq!(err, BuildErr::DuplicateTag { tag: "byte" });
    }

    #[test]
    fn size_mismatch_is_reported() {
        // reads two bytes per element while claiming one
        fn decode_wide(storage: &mut Storage, count: usize, reader: &mut ViewReader<'_>) -> Result<(), DecodeErr> {
            let out = storage.downcast_mut::<Vec<u16>>().unwrap();
            for _ in 0..count {
                out.push(reader.read_u16()?);
            }
            Ok(())
        }
        fn allocate_wide(count: usize) -> Storage {
            Box::new(Vec::<u16>::with_capacity(count))
        }
        let registry = TypeTagRegistry::build(&[(Kind::Byte, Entry::from_fns(allocate_wide, decode_wide, 1))]).unwrap();
        let view = ByteView::view(&[0_u8; 8]);
        let mut reader = view.reader();
        let err = registry.decode_elements(0, 2, &mut reader).unwrap_err();
        assert!(matches!(err, Err::DecodeFailed { source: DecodeErr::Inconsistent(_), .. }));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn failed_decode_keeps_position() {
        // 0xFF marks a record that does not decode
        fn decode_checked(storage: &mut Storage, count: usize, reader: &mut ViewReader<'_>) -> Result<(), DecodeErr> {
            let out = storage.downcast_mut::<Vec<u8>>().unwrap();
            for _ in 0..count {
                match reader.read_u8()? {
                    0xFF => return Err(DecodeErr::Inconsistent("reserved value".to_string())),
                    value => out.push(value),
                }
            }
            Ok(())
        }
        fn allocate_checked(count: usize) -> Storage {
            Box::new(Vec::<u8>::with_capacity(count))
        }
        let registry =
            TypeTagRegistry::build(&[(Kind::Byte, Entry::from_fns(allocate_checked, decode_checked, 1))]).unwrap();
        let view = ByteView::view(&[1_u8, 2, 0xFF, 4]);
        let mut reader = view.reader();
        reader.skip(1).unwrap();

        let err = registry.decode_elements(0, 3, &mut reader).unwrap_err();
        assert!(matches!(err, Err::DecodeFailed { count: 3, source: DecodeErr::Inconsistent(_), .. }));
        assert_eq!(reader.position(), 1);

        let decoded = registry.decode_elements(0, 1, &mut reader).unwrap();
        assert_eq!(decoded.as_slice::<u8>(), Some(&[2_u8][..]));
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn shared_result() {
        let view = ByteView::view(&[7_u8, 8]);
        let decoded = registry().decode_elements(0, 2, &mut view.reader()).unwrap();
        let other = decoded.clone();
        drop(decoded);
        assert_eq!(other.as_slice::<u8>(), Some(&[7_u8, 8][..]));
    }
}
