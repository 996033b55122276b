// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

pub mod as_any;
pub mod errors;
pub mod math;
pub mod open_flags;
pub mod uapi;
pub mod user_address;
pub mod user_buffer;

pub use uapi::*;
