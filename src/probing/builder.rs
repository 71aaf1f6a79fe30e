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

use crate::error::Error;
use crate::probing::ProbingSet;

/// Number of slots a set starts with unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 7;

/// Load factor at which an insert grows the set before placing its value.
pub const DEFAULT_LOAD_FACTOR_THRESHOLD: f64 = 0.65;

/// Builder for creating probing sets.
///
/// # Examples
///
/// ```
/// use probeset::probing::ProbingSet;
///
/// let set = ProbingSet::builder()
///     .initial_capacity(31)
///     .load_factor_threshold(0.5)
///     .build()
///     .unwrap();
///
/// assert_eq!(set.capacity(), 31);
/// assert_eq!(set.load_factor_threshold(), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct ProbingSetBuilder {
    initial_capacity: usize,
    load_factor_threshold: f64,
}

impl Default for ProbingSetBuilder {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            load_factor_threshold: DEFAULT_LOAD_FACTOR_THRESHOLD,
        }
    }
}

impl ProbingSetBuilder {
    /// Sets the number of slots the set starts with.
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the load factor that triggers growth.
    ///
    /// The threshold must lie strictly between 0 and 1. A threshold of 1 or more lets the
    /// table fill up completely before growing.
    pub fn load_factor_threshold(mut self, load_factor_threshold: f64) -> Self {
        self.load_factor_threshold = load_factor_threshold;
        self
    }

    /// Builds the set.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if the
    /// initial capacity is zero or the load factor threshold is outside `(0, 1)`.
    pub fn build(self) -> Result<ProbingSet, Error> {
        if self.initial_capacity == 0 {
            return Err(Error::config_invalid("initial capacity must be at least 1")
                .with_context("initial_capacity", self.initial_capacity));
        }
        if !is_valid_load_factor_threshold(self.load_factor_threshold) {
            return Err(
                Error::config_invalid("load factor threshold must be in (0, 1)")
                    .with_context("load_factor_threshold", self.load_factor_threshold),
            );
        }
        Ok(ProbingSet::with_config(
            self.initial_capacity,
            self.load_factor_threshold,
        ))
    }
}

pub(super) fn is_valid_load_factor_threshold(threshold: f64) -> bool {
    threshold > 0.0 && threshold < 1.0
}
