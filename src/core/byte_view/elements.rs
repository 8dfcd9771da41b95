use std::{fmt, iter::FusedIterator, marker::PhantomData};

use crate::core::shared::{Element, Endianness};

/// A typed, read-only window of `len()` values of type `T`.
///
/// Values are decoded on access, so the underlying bytes need no particular
/// alignment. The window is only ever constructed after the range has been
/// checked, hence indexing within `0..len()` cannot go out of bounds.
#[derive(Clone, Copy)]
pub struct Elements<'a, T: Element> {
	bytes: &'a [u8],

	/// the number of values in the window.
	len: usize,

	/// distance in bytes between the starts of two consecutive values.
	/// It is never less than 'T::SIZE'.
	stride: usize,

	endianness: Endianness,

	_phantom: PhantomData<T>,
}

impl<'a, T: Element> Elements<'a, T> {
	/// 'bytes.len()' must be 'len * T::SIZE'.
	pub(crate) fn packed(bytes: &'a [u8], len: usize, endianness: Endianness) -> Self {
		debug_assert_eq!(bytes.len(), len * T::SIZE);
		Self { bytes, len, stride: T::SIZE, endianness, _phantom: PhantomData }
	}

	/// 'bytes' must hold 'len' records 'stride' bytes apart, the last one possibly truncated to 'T::SIZE'.
	pub(crate) fn strided(bytes: &'a [u8], len: usize, stride: usize, endianness: Endianness) -> Self {
		debug_assert!(stride >= T::SIZE);
		debug_assert!(len == 0 || bytes.len() >= (len - 1) * stride + T::SIZE);
		Self { bytes, len, stride, endianness, _phantom: PhantomData }
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn stride(&self) -> usize {
		self.stride
	}

	/// The raw bytes covered by the window, including any padding between strided values.
	pub fn as_bytes(&self) -> &'a [u8] {
		self.bytes
	}

	pub fn get(&self, index: usize) -> Option<T> {
		if index >= self.len {
			return None;
		}
		let start = index * self.stride;
		Some(T::from_bytes(&self.bytes[start..start + T::SIZE], self.endianness))
	}

	pub fn iter(&self) -> Iter<'a, T> {
		Iter { elements: *self, front: 0, back: self.len }
	}

	pub fn to_vec(&self) -> Vec<T> {
		self.iter().collect()
	}
}

impl<T: Element + fmt::Debug> fmt::Debug for Elements<'_, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

impl<'a, T: Element> IntoIterator for Elements<'a, T> {
	type Item = T;
	type IntoIter = Iter<'a, T>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

pub struct Iter<'a, T: Element> {
	elements: Elements<'a, T>,
	front: usize,
	back: usize,
}

impl<T: Element> Iterator for Iter<'_, T> {
	type Item = T;

	fn next(&mut self) -> Option<T> {
		if self.front == self.back {
			return None;
		}
		let value = self.elements.get(self.front);
		self.front += 1;
		value
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let n = self.back - self.front;
		(n, Some(n))
	}
}

impl<T: Element> DoubleEndedIterator for Iter<'_, T> {
	fn next_back(&mut self) -> Option<T> {
		if self.front == self.back {
			return None;
		}
		self.back -= 1;
		self.elements.get(self.back)
	}
}

impl<T: Element> ExactSizeIterator for Iter<'_, T> {}
impl<T: Element> FusedIterator for Iter<'_, T> {}


#[cfg(test)]
mod tests {
	use crate::core::byte_view::ByteView;

	#[test]
	fn iterate_both_ways() {
		let data: Vec<u8> = [1.0_f32, 2.0, 3.0].iter().flat_map(|v| v.to_le_bytes()).collect();
		let view = ByteView::view(&data);
		let values = view.get::<f32>(0, 3).unwrap();
		assert_eq!(values.len(), 3);
		assert_eq!(values.iter().len(), 3);
		assert_eq!(values.iter().rev().collect::<Vec<_>>(), vec![3.0, 2.0, 1.0]);
		assert_eq!(values.get(3), None);
		assert_eq!(format!("{:?}", values), "[1.0, 2.0, 3.0]");
	}

	#[test]
	fn array_elements() {
		let data: Vec<u8> = (0_u8..12).collect();
		let view = ByteView::view(&data);
		let triples = view.get::<[u8; 3]>(0, 4).unwrap();
		assert_eq!(triples.get(1), Some([3, 4, 5]));
		assert_eq!(triples.into_iter().last(), Some([9, 10, 11]));
	}
}
