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

//! Data types shared across the account storage code.

use std::path::PathBuf;

use crate::support::error::Error;

/// The database file every real account folder contains.
///
/// Its presence is what distinguishes an account folder from unrelated
/// clutter under the storage root.
pub const ACCOUNT_DB: &str = "db.sqlite";

/// What kind of on-disk layout a storage root currently holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// The registry file exists; the root is already in the numbered layout.
    AlreadyMigrated,
    /// At least one legacy per-address account folder is present.
    Legacy,
    /// Nothing recognisable; a fresh root, a missing directory, or a
    /// directory containing only unrelated files.
    EmptyOrUnknown,
}

/// One legacy account folder found under the storage root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyAccountEntry {
    /// The folder's name as it appears on disk.
    pub folder_name: String,
    /// Full path to the folder.
    pub path: PathBuf,
    /// The e-mail address the folder name decodes to, if it does.
    ///
    /// `None` means the name didn't decode; the folder is still migrated,
    /// since whatever is inside it is account data regardless.
    pub address: Option<String>,
}

/// How migrating one legacy folder ended.
#[derive(Debug)]
pub enum MigrationStatus {
    /// The folder's contents now live in a numbered account directory.
    Migrated,
    /// The folder was empty and was simply removed.
    Skipped,
    /// The folder could not be migrated and was left in place.
    Failed(Error),
}

impl MigrationStatus {
    pub fn is_migrated(&self) -> bool {
        matches!(self, MigrationStatus::Migrated)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MigrationStatus::Failed(..))
    }
}

/// The per-folder result of a migration run.
#[derive(Debug)]
pub struct MigrationOutcome {
    pub entry: LegacyAccountEntry,
    pub status: MigrationStatus,
}

/// What a whole migration run did.
#[derive(Debug)]
pub struct MigrationReport {
    /// Whether this run wrote a registry file. `false` when there was
    /// nothing to do, or when no account made it into the new layout.
    pub migrated: bool,
    pub outcomes: Vec<MigrationOutcome>,
}

impl MigrationReport {
    pub(crate) fn nothing_to_do() -> Self {
        MigrationReport {
            migrated: false,
            outcomes: Vec::new(),
        }
    }
}
