// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod anon_node;
mod fd_table;
mod file_object;
mod memory_file;

pub mod buffers;
pub mod io_uring;

pub use anon_node::*;
pub use buffers::*;
pub use fd_table::*;
pub use file_object::*;
pub use memory_file::*;
