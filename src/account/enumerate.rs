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

//! Discovery of legacy account folders under a storage root.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::account::folder_name;
use crate::account::model::LegacyAccountEntry;
use crate::account::plan::parse_slot_name;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

/// Lists the legacy account folders under `root`.
///
/// Every immediate subdirectory is a candidate except symlinks and numbered
/// id slots from an earlier run. A folder whose name doesn't decode to an
/// address is listed anyway with `address = None`; whatever failed to encode
/// its name, the data inside still belongs to somebody.
///
/// The result is sorted by folder name so that id assignment comes out the
/// same on every run over an unchanged tree.
pub fn enumerate_legacy_accounts(
    log_prefix: &LogPrefix,
    root: &Path,
) -> Result<Vec<LegacyAccountEntry>, Error> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let path = entry.path();
        let (folder_name, address) = match entry.file_name().into_string() {
            Ok(name) => {
                if parse_slot_name(&name).is_some() {
                    debug!(
                        "{} Ignoring numbered directory '{}'",
                        log_prefix, name
                    );
                    continue;
                }

                let address = match folder_name::decode(&name) {
                    Ok(address) => Some(address),
                    Err(e) => {
                        warn!(
                            "{} Folder name '{}' doesn't decode to an \
                             address ({}); migrating it anyway",
                            log_prefix, name, e
                        );
                        None
                    }
                };
                (name, address)
            }
            Err(os_name) => {
                let name = os_name.to_string_lossy().into_owned();
                warn!(
                    "{} Folder name '{}' is not valid UTF-8; \
                     migrating it anyway",
                    log_prefix, name
                );
                (name, None)
            }
        };

        entries.push(LegacyAccountEntry {
            folder_name,
            path,
            address,
        });
    }

    entries.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
    Ok(entries)
}

#[cfg(test)]
mod test {
    use super::*;

    fn prefix() -> LogPrefix {
        LogPrefix::new("enumerate".to_owned())
    }

    #[test]
    fn lists_sorted_with_decoded_addresses() {
        let root = tempfile::TempDir::new().unwrap();
        fs::create_dir(root.path().join("user2%40example.org")).unwrap();
        fs::create_dir(root.path().join("user%40example.com")).unwrap();

        let entries =
            enumerate_legacy_accounts(&prefix(), root.path()).unwrap();

        assert_eq!(2, entries.len());
        assert_eq!("user%40example.com", entries[0].folder_name);
        assert_eq!(Some("user@example.com".to_owned()), entries[0].address);
        assert_eq!("user2%40example.org", entries[1].folder_name);
        assert_eq!(Some("user2@example.org".to_owned()), entries[1].address);
        assert_eq!(root.path().join("user%40example.com"), entries[0].path);
    }

    #[test]
    fn undecodable_names_are_kept_without_address() {
        let root = tempfile::TempDir::new().unwrap();
        fs::create_dir(root.path().join("100%done")).unwrap();

        let entries =
            enumerate_legacy_accounts(&prefix(), root.path()).unwrap();

        assert_eq!(1, entries.len());
        assert_eq!("100%done", entries[0].folder_name);
        assert_eq!(None, entries[0].address);
    }

    #[test]
    fn slots_files_and_symlinks_are_skipped() {
        let root = tempfile::TempDir::new().unwrap();
        fs::create_dir(root.path().join("1")).unwrap();
        fs::write(root.path().join("1/db.sqlite"), b"x").unwrap();
        fs::write(root.path().join("stray.txt"), b"x").unwrap();
        fs::create_dir(root.path().join("real+40example.com")).unwrap();

        let elsewhere = tempfile::TempDir::new().unwrap();
        std::os::unix::fs::symlink(
            elsewhere.path(),
            root.path().join("linked+40example.com"),
        )
        .unwrap();

        let entries =
            enumerate_legacy_accounts(&prefix(), root.path()).unwrap();

        assert_eq!(1, entries.len());
        assert_eq!("real+40example.com", entries[0].folder_name);
    }

    #[test]
    fn noncanonical_numbers_are_legacy_folders() {
        let root = tempfile::TempDir::new().unwrap();
        fs::create_dir(root.path().join("007")).unwrap();

        let entries =
            enumerate_legacy_accounts(&prefix(), root.path()).unwrap();

        assert_eq!(1, entries.len());
        assert_eq!("007", entries[0].folder_name);
        // "007" decodes to itself; digits are unreserved.
        assert_eq!(Some("007".to_owned()), entries[0].address);
    }
}
