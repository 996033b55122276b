// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod kernel;
mod task;

pub use kernel::*;
pub use task::*;
