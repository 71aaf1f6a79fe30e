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

//! Integer set backed by an open-addressing hash table with quadratic probing.
//!
//! Every value lives directly in a flat slot array. A value `v` is placed at `v mod capacity`
//! when that slot is free, otherwise at the first free slot of `(v + i²) mod capacity` for
//! `i = 0, 1, 2, ...`. Negative values wrap into `[0, capacity)`. Lookups and removals walk the
//! same sequence for at most `capacity` retries, so a search for an absent value always ends.
//!
//! The table starts with 7 slots and grows to `capacity * 2 + 1` slots whenever an insert
//! begins with the load factor at or above the threshold (0.65 by default).
//!
//! # Usage
//!
//! ```rust
//! use probeset::probing::ProbingSet;
//!
//! let mut set = ProbingSet::new();
//! set.insert(10);
//! set.insert(17);
//! assert_eq!(set.find(17), Some(4));
//!
//! set.remove(10);
//! assert_eq!(set.find(10), None);
//! assert_eq!(set.size(), 1);
//!
//! for value in 0..6 {
//!     set.insert(value);
//! }
//! assert_eq!(set.capacity(), 15);
//! ```
//!
//! # Serialization
//!
//! ```rust
//! # use probeset::probing::ProbingSet;
//! let set: ProbingSet = [-1, 0, 42].into_iter().collect();
//!
//! let bytes = set.serialize();
//! let decoded = ProbingSet::deserialize(&bytes).unwrap();
//! assert_eq!(decoded.find(-1), set.find(-1));
//! assert_eq!(decoded, set);
//! ```

mod builder;
mod serialization;
mod set;

pub use self::builder::DEFAULT_CAPACITY;
pub use self::builder::DEFAULT_LOAD_FACTOR_THRESHOLD;
pub use self::builder::ProbingSetBuilder;
pub use self::set::Iter;
pub use self::set::ProbingSet;
