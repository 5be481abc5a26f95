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

//! The account registry file.
//!
//! In the numbered layout, the storage root carries a single `accounts.toml`
//! naming every account directory:
//!
//! ```toml
//! selected_account = 1
//! next_id = 3
//!
//! [[accounts]]
//! id = 1
//! dir = "1"
//!
//! [[accounts]]
//! id = 2
//! dir = "2"
//! ```
//!
//! The engine treats the presence of this file as authoritative. A root
//! containing it is never scanned for legacy folders again, so writing the
//! registry is the commit point of a migration.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::support::error::Error;
use crate::support::file_ops;

/// Name of the registry file under the storage root.
pub const REGISTRY_FILE: &str = "accounts.toml";

/// The lowest account id the engine hands out. 0 is reserved to mean "no
/// account selected".
pub const FIRST_ACCOUNT_ID: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Id of the account the client shows on next start, or 0 for none.
    pub selected_account: u32,
    /// The id the engine will assign to the next account created.
    pub next_id: u32,
    pub accounts: Vec<RegistryEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: u32,
    /// Directory holding the account, relative to the storage root.
    pub dir: String,
}

impl RegistryEntry {
    /// The entry for account `id` stored in the conventional directory named
    /// after the id itself.
    pub fn for_id(id: u32) -> Self {
        RegistryEntry {
            id,
            dir: id.to_string(),
        }
    }
}

impl Registry {
    /// Builds a registry around `accounts`, deriving the header fields.
    ///
    /// `next_id` becomes one past the highest id in use and the account with
    /// the lowest id is selected, so the client starts up showing something
    /// rather than an empty pane.
    pub fn from_entries(mut accounts: Vec<RegistryEntry>) -> Self {
        accounts.sort_by_key(|a| a.id);
        let next_id = accounts
            .last()
            .map(|a| a.id + 1)
            .unwrap_or(FIRST_ACCOUNT_ID);
        let selected_account = accounts.first().map(|a| a.id).unwrap_or(0);

        Registry {
            selected_account,
            next_id,
            accounts,
        }
    }

    pub fn load(root: &Path) -> Result<Self, Error> {
        let mut data = Vec::new();
        fs::File::open(root.join(REGISTRY_FILE))?.read_to_end(&mut data)?;
        Ok(toml::from_slice(&data)?)
    }

    /// Writes the registry to its place under `root`, atomically.
    ///
    /// The temporary file is staged inside `root` itself so that the final
    /// rename cannot cross file systems.
    pub fn store(&self, root: &Path) -> Result<(), Error> {
        let data = toml::to_vec(self)?;
        file_ops::spit(root, root.join(REGISTRY_FILE), true, 0o600, &data)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_entries_derives_header_fields() {
        let registry = Registry::from_entries(vec![
            RegistryEntry::for_id(4),
            RegistryEntry::for_id(1),
            RegistryEntry::for_id(2),
        ]);

        assert_eq!(1, registry.selected_account);
        assert_eq!(5, registry.next_id);
        assert_eq!(
            vec!["1", "2", "4"],
            registry
                .accounts
                .iter()
                .map(|a| a.dir.as_str())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn from_entries_empty() {
        let registry = Registry::from_entries(vec![]);
        assert_eq!(0, registry.selected_account);
        assert_eq!(FIRST_ACCOUNT_ID, registry.next_id);
        assert!(registry.accounts.is_empty());
    }

    #[test]
    fn from_entries_largest_id() {
        // u32::MAX - 1 is the largest id a slot scan can produce; the
        // derived next_id must still fit.
        let registry =
            Registry::from_entries(vec![RegistryEntry::for_id(u32::MAX - 1)]);
        assert_eq!(u32::MAX - 1, registry.selected_account);
        assert_eq!(u32::MAX, registry.next_id);
    }

    #[test]
    fn store_then_load_round_trips() {
        let root = tempfile::TempDir::new().unwrap();
        let registry = Registry::from_entries(vec![
            RegistryEntry::for_id(1),
            RegistryEntry::for_id(2),
        ]);

        registry.store(root.path()).unwrap();
        let loaded = Registry::load(root.path()).unwrap();
        assert_eq!(registry, loaded);

        let text =
            fs::read_to_string(root.path().join(REGISTRY_FILE)).unwrap();
        assert!(text.contains("selected_account = 1"));
        assert!(text.contains("next_id = 3"));
        assert!(text.contains("[[accounts]]"));
        assert!(text.contains("dir = \"1\""));
    }

    #[test]
    fn load_accepts_files_the_engine_writes() {
        let root = tempfile::TempDir::new().unwrap();
        fs::write(
            root.path().join(REGISTRY_FILE),
            "selected_account = 2\n\
             next_id = 7\n\
             \n\
             [[accounts]]\n\
             id = 2\n\
             dir = \"2\"\n",
        )
        .unwrap();

        let registry = Registry::load(root.path()).unwrap();
        assert_eq!(2, registry.selected_account);
        assert_eq!(7, registry.next_id);
        assert_eq!(vec![RegistryEntry::for_id(2)], registry.accounts);
    }
}
