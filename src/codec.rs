// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Little-endian byte buffers backing the set image format.

use std::io;
use std::io::Cursor;
use std::io::Read;

pub(crate) struct SetBytes {
    bytes: Vec<u8>,
}

impl SetBytes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    pub fn write_u64_le(&mut self, n: u64) {
        self.write(&n.to_le_bytes());
    }

    pub fn write_i64_le(&mut self, n: i64) {
        self.write(&n.to_le_bytes());
    }

    pub fn write_f64_le(&mut self, n: f64) {
        self.write(&n.to_le_bytes());
    }
}

pub(crate) struct SetSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl<'a> SetSlice<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self {
            slice: Cursor::new(slice),
        }
    }

    /// Number of bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        let len = self.slice.get_ref().len() as u64;
        (len - self.slice.position().min(len)) as usize
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.slice.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    pub fn read_u64_le(&mut self) -> io::Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub fn read_i64_le(&mut self) -> io::Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    pub fn read_f64_le(&mut self) -> io::Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_mixed_fields() {
        let mut bytes = SetBytes::with_capacity(25);
        bytes.write_u8(7);
        bytes.write_u64_le(15);
        bytes.write_i64_le(-1);
        bytes.write_f64_le(0.65);
        let bytes = bytes.into_bytes();
        assert_eq!(bytes.len(), 25);
        assert_eq!(&bytes[1..9], &[15, 0, 0, 0, 0, 0, 0, 0]);

        let mut slice = SetSlice::new(&bytes);
        assert_eq!(slice.read_u8().unwrap(), 7);
        assert_eq!(slice.read_u64_le().unwrap(), 15);
        assert_eq!(slice.remaining(), 16);
        assert_eq!(slice.read_i64_le().unwrap(), -1);
        assert_eq!(slice.read_f64_le().unwrap(), 0.65);
        assert_eq!(slice.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut slice = SetSlice::new(&[1, 2, 3]);
        let err = slice.read_u64_le().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
