// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::task::CurrentTask;
use crate::vfs::{FileHandle, FileObject, FileOps};
use ternix_uapi::open_flags::OpenFlags;

/// Factory for anonymous file objects, the equivalent of anon_inode files.
/// `name` is the type-name of the node, e.g. "[io_uring]".
pub struct Anon;

impl Anon {
    pub fn new_file(
        _current_task: &CurrentTask,
        ops: Box<dyn FileOps>,
        flags: OpenFlags,
        name: &'static str,
    ) -> FileHandle {
        FileObject::new_anonymous(ops, name, flags)
    }
}
