// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Minimal RLP encoder for legacy Ethereum transactions

/// One RLP item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
	Bytes(Vec<u8>),
	List(Vec<Item>),
}

impl Item {
	/// Unsigned integer as its minimal big-endian byte string
	pub fn uint(value: u128) -> Self {
		Item::Bytes(trim_leading_zeros(&value.to_be_bytes()))
	}

	/// Big-endian scalar such as a signature component, leading zeros
	/// stripped
	pub fn scalar(bytes: &[u8]) -> Self {
		Item::Bytes(trim_leading_zeros(bytes))
	}

	pub fn bytes(bytes: &[u8]) -> Self {
		Item::Bytes(bytes.to_vec())
	}
}

fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
	let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
	bytes[start..].to_vec()
}

fn header(out: &mut Vec<u8>, len: usize, short: u8, long: u8) {
	if len <= 55 {
		out.push(short + len as u8);
	} else {
		let len_bytes = trim_leading_zeros(&(len as u64).to_be_bytes());
		out.push(long + len_bytes.len() as u8);
		out.extend_from_slice(&len_bytes);
	}
}

pub fn encode(item: &Item) -> Vec<u8> {
	let mut out = Vec::new();
	encode_into(item, &mut out);
	out
}

fn encode_into(item: &Item, out: &mut Vec<u8>) {
	match item {
		Item::Bytes(bytes) if bytes.len() == 1 && bytes[0] < 0x80 => out.push(bytes[0]),
		Item::Bytes(bytes) => {
			header(out, bytes.len(), 0x80, 0xb7);
			out.extend_from_slice(bytes);
		}
		Item::List(items) => {
			let mut payload = Vec::new();
			for item in items {
				encode_into(item, &mut payload);
			}
			header(out, payload.len(), 0xc0, 0xf7);
			out.extend_from_slice(&payload);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_strings() {
		assert_eq!(encode(&Item::bytes(b"dog")), vec![0x83, b'd', b'o', b'g']);
		assert_eq!(encode(&Item::bytes(b"")), vec![0x80]);
		assert_eq!(encode(&Item::bytes(&[0x0f])), vec![0x0f]);
		assert_eq!(encode(&Item::bytes(&[0x80])), vec![0x81, 0x80]);
	}

	#[test]
	fn test_integers() {
		assert_eq!(encode(&Item::uint(0)), vec![0x80]);
		assert_eq!(encode(&Item::uint(15)), vec![0x0f]);
		assert_eq!(encode(&Item::uint(1024)), vec![0x82, 0x04, 0x00]);
	}

	#[test]
	fn test_lists() {
		let cat_dog = Item::List(vec![Item::bytes(b"cat"), Item::bytes(b"dog")]);
		assert_eq!(
			encode(&cat_dog),
			vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
		);
		assert_eq!(encode(&Item::List(vec![])), vec![0xc0]);
	}

	#[test]
	fn test_long_string() {
		let text = b"Lorem ipsum dolor sit amet, consectetur adipisicing elit";
		let encoded = encode(&Item::bytes(text));
		assert_eq!(&encoded[..2], &[0xb8, 0x38]);
		assert_eq!(&encoded[2..], text);
	}
}
