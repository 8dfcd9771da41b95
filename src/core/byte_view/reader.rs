use super::{checked_range, Elements, Err};
use crate::core::shared::{Element, Endianness};

/// Reads the bytes of a view front to back.
/// Mostly used by the per-type decoders of the registry.
#[derive(Clone, Debug)]
pub struct ViewReader<'a> {
	data: &'a [u8],

	/// the offset of the next byte to be read. It is never greater than 'data.len()'.
	pos: usize,

	endianness: Endianness,
}

impl<'a> ViewReader<'a> {
	pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
		Self { data, pos: 0, endianness }
	}

	pub fn position(&self) -> usize {
		self.pos
	}

	/// the total number of bytes behind the reader, read or not.
	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn remaining(&self) -> usize {
		self.data.len() - self.pos
	}

	pub fn is_empty(&self) -> bool {
		self.remaining() == 0
	}

	pub fn endianness(&self) -> Endianness {
		self.endianness
	}

	pub fn set_endianness(&mut self, endianness: Endianness) {
		self.endianness = endianness;
	}

	/// reads a single value and advances past it.
	/// The position is left unchanged on failure.
	pub fn read<T: Element>(&mut self) -> Result<T, Err> {
		let range = checked_range(self.data.len(), self.pos, 1, T::SIZE)?;
		self.pos = range.end;
		Ok(T::from_bytes(&self.data[range], self.endianness))
	}

	/// reads 'count' consecutive values and advances past them.
	pub fn read_elements<T: Element>(&mut self, count: usize) -> Result<Elements<'a, T>, Err> {
		let range = checked_range(self.data.len(), self.pos, count, T::SIZE)?;
		self.pos = range.end;
		Ok(Elements::packed(&self.data[range], count, self.endianness))
	}

	pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Err> {
		let range = checked_range(self.data.len(), self.pos, len, 1)?;
		self.pos = range.end;
		Ok(&self.data[range])
	}

	pub fn skip(&mut self, len: usize) -> Result<(), Err> {
		self.read_bytes(len).map(|_| ())
	}

	pub fn read_u8(&mut self) -> Result<u8, Err> {
		self.read()
	}

	pub fn read_u16(&mut self) -> Result<u16, Err> {
		self.read()
	}

	pub fn read_u32(&mut self) -> Result<u32, Err> {
		self.read()
	}

	pub fn read_u64(&mut self) -> Result<u64, Err> {
		self.read()
	}

	pub fn read_i16(&mut self) -> Result<i16, Err> {
		self.read()
	}

	pub fn read_i32(&mut self) -> Result<i32, Err> {
		self.read()
	}

	pub fn read_f32(&mut self) -> Result<f32, Err> {
		self.read()
	}

	pub fn read_f64(&mut self) -> Result<f64, Err> {
		self.read()
	}
}
