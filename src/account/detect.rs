//-
// Copyright (c) 2025, The Rehome Developers
//
// This file is part of Rehome.
//
// Rehome is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Rehome is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Rehome. If not, see <http://www.gnu.org/licenses/>.

//! Classification of what currently lives under a storage root.

use std::fs;
use std::path::Path;

use crate::account::folder_name;
use crate::account::model::{Layout, ACCOUNT_DB};
use crate::account::registry::REGISTRY_FILE;
use crate::support::error::Error;

/// Determines the layout of the storage root at `root`.
///
/// The registry file is authoritative: if it exists, the root is
/// `AlreadyMigrated` no matter what else is lying around. A missing or
/// unrecognisable root is `EmptyOrUnknown`, which callers treat as "nothing
/// to migrate". A root that exists but cannot be read is an error.
pub fn detect_layout(root: &Path) -> Result<Layout, Error> {
    if root.join(REGISTRY_FILE).is_file() {
        return Ok(Layout::AlreadyMigrated);
    }

    if !root.is_dir() {
        return Ok(Layout::EmptyOrUnknown);
    }

    for entry in fs::read_dir(root)? {
        if is_legacy_candidate(&entry?)? {
            return Ok(Layout::Legacy);
        }
    }

    Ok(Layout::EmptyOrUnknown)
}

/// Whether a directory entry could be a legacy account folder.
///
/// True for a real subdirectory (not a symlink) whose name decodes as an
/// escaped address, or which contains the account database. The decode test
/// is deliberately loose: it also accepts plain names such as the numbered
/// directories left behind by an interrupted earlier run, which keeps a
/// half-migrated root reading as `Legacy` so a rerun can finish the job.
/// The database check catches folders whose names do not decode at all.
fn is_legacy_candidate(entry: &fs::DirEntry) -> Result<bool, Error> {
    if !entry.file_type()?.is_dir() {
        return Ok(false);
    }

    if let Ok(name) = entry.file_name().into_string() {
        if folder_name::decode(&name).is_ok() {
            return Ok(true);
        }
    }

    Ok(entry.path().join(ACCOUNT_DB).is_file())
}
