pub mod elements;
pub mod reader;

use std::{fmt, ops::Range};

use super::shared::{Element, Endianness};
pub use elements::Elements;
pub use reader::ViewReader;

/// A view over a contiguous range of bytes read from an asset file.
///
/// The view either borrows memory owned elsewhere or owns its allocation.
/// It is move-only: `Clone` is not implemented, since two owning copies would
/// release the same allocation twice. Several readers share one buffer by taking
/// non-owning aliases with [`ByteView::alias`]; the borrow checker keeps the
/// owner alive for as long as any alias exists.
///
/// All typed access goes through [`ByteView::get`] and friends, which check the
/// requested range against the length without overflowing.
pub enum ByteView<'a> {
    Borrowed(&'a [u8]),
    Owned(Box<[u8]>),
}

impl<'a> ByteView<'a> {
    /// Wraps memory owned by the caller.
    pub fn view(bytes: &'a [u8]) -> Self {
        ByteView::Borrowed(bytes)
    }

    /// Takes ownership of `buffer`. The allocation is released exactly once,
    /// when the view (or whatever it was moved into) is dropped.
    pub fn owning(buffer: impl Into<Box<[u8]>>) -> ByteView<'static> {
        ByteView::Owned(buffer.into())
    }

    /// Wraps external memory given as a pointer and a length.
    /// A null pointer or a zero length yields an empty view.
    ///
    /// # Safety
    /// When `ptr` is non-null, it must point to `len` initialized bytes that stay
    /// valid and unmodified for `'a`.
    pub unsafe fn from_raw_parts(ptr: *const u8, len: usize) -> Self {
        if ptr.is_null() || len == 0 {
            return ByteView::Borrowed(&[]);
        }
        // Safety: guaranteed by the caller.
        ByteView::Borrowed(unsafe { std::slice::from_raw_parts(ptr, len) })
    }

    /// Returns a non-owning view of the same bytes, whether or not `self` owns them.
    pub fn alias(&self) -> ByteView<'_> {
        ByteView::Borrowed(self.as_bytes())
    }

    /// Moves the contents out, leaving an empty borrowed view behind.
    pub fn take(&mut self) -> ByteView<'a> {
        std::mem::take(self)
    }

    /// Converts into an owning view, copying the bytes if they were borrowed.
    pub fn into_owned(self) -> ByteView<'static> {
        match self {
            ByteView::Borrowed(bytes) => ByteView::Owned(bytes.into()),
            ByteView::Owned(buffer) => ByteView::Owned(buffer),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, ByteView::Owned(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ByteView::Borrowed(bytes) => bytes,
            ByteView::Owned(buffer) => buffer,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `count` little-endian values of type `T` starting at byte `offset`.
    pub fn get<T: Element>(&self, offset: usize, count: usize) -> Result<Elements<'_, T>, Err> {
        self.get_with(offset, count, Endianness::Little)
    }

    /// Same as [`ByteView::get`] with an explicit byte order.
    pub fn get_with<T: Element>(&self, offset: usize, count: usize, endianness: Endianness) -> Result<Elements<'_, T>, Err> {
        let range = checked_range(self.len(), offset, count, T::SIZE)?;
        Ok(Elements::packed(&self.as_bytes()[range], count, endianness))
    }

    /// Reads a single little-endian value at byte `offset`.
    pub fn read<T: Element>(&self, offset: usize) -> Result<T, Err> {
        let range = checked_range(self.len(), offset, 1, T::SIZE)?;
        Ok(T::from_bytes(&self.as_bytes()[range], Endianness::Little))
    }

    /// Returns `count` values of type `T` whose starts are `stride` bytes apart,
    /// as found in interleaved vertex buffers.
    /// Only the bytes of the last record have to fit, not a full trailing stride.
    pub fn get_strided<T: Element>(&self, offset: usize, count: usize, stride: usize) -> Result<Elements<'_, T>, Err> {
        if stride < T::SIZE {
            return Err(Err::InvalidStride { stride, element_size: T::SIZE });
        }
        let len = self.len();
        let out_of_range = Err::OutOfRange { offset, count, element_size: stride, len };
        if offset > len {
            return Err(out_of_range);
        }
        if count == 0 {
            return Ok(Elements::strided(&[], 0, stride, Endianness::Little));
        }
        let span = (count - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(T::SIZE))
            .ok_or(out_of_range)?;
        if span > len - offset {
            return Err(out_of_range);
        }
        Ok(Elements::strided(&self.as_bytes()[offset..offset + span], count, stride, Endianness::Little))
    }

    /// Returns a non-owning view of `len` bytes starting at `offset`.
    pub fn subview(&self, offset: usize, len: usize) -> Result<ByteView<'_>, Err> {
        let range = checked_range(self.len(), offset, len, 1)?;
        Ok(ByteView::Borrowed(&self.as_bytes()[range]))
    }

    /// Returns a little-endian cursor over the whole view.
    pub fn reader(&self) -> ViewReader<'_> {
        ViewReader::new(self.as_bytes(), Endianness::Little)
    }

    pub fn reader_with(&self, endianness: Endianness) -> ViewReader<'_> {
        ViewReader::new(self.as_bytes(), endianness)
    }
}

/// Computes the byte range of `count` elements of `element_size` bytes at `offset`
/// in a buffer of `len` bytes.
/// `element_size` must not be zero.
pub(crate) fn checked_range(len: usize, offset: usize, count: usize, element_size: usize) -> Result<Range<usize>, Err> {
    debug_assert!(element_size > 0, "zero-sized elements are not supported");
    let out_of_range = Err::OutOfRange { offset, count, element_size, len };
    if offset > len {
        return Err(out_of_range);
    }
    // Dividing the remaining length keeps 'count * element_size' from overflowing.
    if count > (len - offset) / element_size {
        return Err(out_of_range);
    }
    Ok(offset..offset + count * element_size)
}

impl Default for ByteView<'_> {
    fn default() -> Self {
        ByteView::Borrowed(&[])
    }
}

impl fmt::Debug for ByteView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_owned() { "Owned" } else { "Borrowed" };
        write!(f, "ByteView::{}({} bytes:", kind, self.len())?;
        for byte in self.as_bytes().iter().take(16) {
            write!(f, " {:02x}", byte)?;
        }
        if self.len() > 16 {
            write!(f, " ..")?;
        }
        write!(f, ")")
    }
}

impl<'a> From<&'a [u8]> for ByteView<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ByteView::Borrowed(bytes)
    }
}

impl From<Vec<u8>> for ByteView<'static> {
    fn from(buffer: Vec<u8>) -> Self {
        ByteView::Owned(buffer.into_boxed_slice())
    }
}

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Err {
    #[error("Stride of {stride} bytes is smaller than the element size of {element_size} bytes")]
    InvalidStride { stride: usize, element_size: usize },
    #[error("Requested {count} element(s) of {element_size} byte(s) at offset {offset}, but the buffer holds only {len} byte(s)")]
    OutOfRange {
        offset: usize,
        count: usize,
        element_size: usize,
        len: usize,
    },
}
