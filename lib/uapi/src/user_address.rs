// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;
use std::ops;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// An address in a guest address space.
///
/// Never dereferenced directly; all access goes through a `MemoryManager`.
#[derive(
    Clone,
    Copy,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    IntoBytes,
    FromBytes,
    KnownLayout,
    Immutable,
)]
#[repr(transparent)]
pub struct UserAddress(u64);

impl UserAddress {
    pub const NULL: Self = Self(0);

    pub const fn from_raw(ptr: u64) -> Self {
        Self(ptr)
    }

    pub fn ptr(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, rhs: usize) -> Option<Self> {
        self.0.checked_add(rhs as u64).map(Self)
    }
}

impl From<u64> for UserAddress {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl ops::Add<usize> for UserAddress {
    type Output = Self;

    fn add(self, rhs: usize) -> Self {
        Self(self.0 + rhs as u64)
    }
}

impl ops::AddAssign<usize> for UserAddress {
    fn add_assign(&mut self, rhs: usize) {
        *self = *self + rhs;
    }
}

impl ops::Sub<UserAddress> for UserAddress {
    type Output = usize;

    fn sub(self, rhs: UserAddress) -> usize {
        (self.0 - rhs.0) as usize
    }
}

impl fmt::Display for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserAddress").field(&format_args!("{:#x}", self.0)).finish()
    }
}
