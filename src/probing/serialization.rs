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

pub(super) const PREAMBLE_LONGS_EMPTY: u8 = 3;
pub(super) const PREAMBLE_LONGS_STANDARD: u8 = 4;
pub(super) const SERIAL_VERSION: u8 = 1;
pub(super) const PROBING_SET_FAMILY_ID: u8 = 31;
pub(super) const PROBING_SET_FAMILY_NAME: &str = "PROBING_SET";
pub(super) const FLAGS_IS_EMPTY: u8 = 1 << 0;
/// Largest capacity an image may declare. Slots are allocated up front from this field.
pub(super) const MAX_CAPACITY: usize = 1 << 26;
pub(super) const LONG_SIZE_BYTES: usize = 8;
/// One slot entry in the image: a `u64` index followed by an `i64` value.
pub(super) const ENTRY_SIZE_BYTES: usize = 2 * LONG_SIZE_BYTES;
