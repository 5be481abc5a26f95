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

//! Assignment of numeric account ids to legacy folders.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::account::model::LegacyAccountEntry;
use crate::account::registry::{RegistryEntry, FIRST_ACCOUNT_ID};
use crate::support::error::Error;

/// A legacy folder together with the account id its contents will move to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedMigration {
    pub id: u32,
    pub entry: LegacyAccountEntry,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Folders to migrate, in input order.
    pub assignments: Vec<PlannedMigration>,
    /// Accounts already sitting in numbered directories, left over from an
    /// interrupted run that never got to write the registry. They are
    /// re-registered as they are.
    pub adopted: Vec<RegistryEntry>,
}

/// Parses a directory name that denotes a numbered account slot.
///
/// Only the canonical decimal form counts; names like `007` or `+1` are
/// ordinary legacy folder names, not slots. `u32::MAX` is excluded as
/// well: it can never appear in a registry, because `next_id` has to be
/// greater than every id in use.
pub fn parse_slot_name(name: &str) -> Option<u32> {
    let id: u32 = name.parse().ok()?;
    if id >= FIRST_ACCOUNT_ID && id < u32::MAX && name == id.to_string() {
        Some(id)
    } else {
        None
    }
}

/// Scans `root` for account ids that are already in use.
///
/// An id is in use when its numbered directory exists and is non-empty. An
/// empty numbered directory is a slot whose move never started, so its id
/// is free to hand out again.
pub fn scan_taken_ids(root: &Path) -> Result<BTreeSet<u32>, Error> {
    let mut taken = BTreeSet::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };

        if let Some(id) = parse_slot_name(&name) {
            // An unreadable slot also counts as taken; we must not assign
            // its id to anything else.
            if fs::read_dir(entry.path())
                .map(|mut dir| dir.next().is_some())
                .unwrap_or(true)
            {
                taken.insert(id);
            }
        }
    }

    Ok(taken)
}

/// Assigns ids to `entries`, avoiding everything in `taken`.
///
/// Each entry receives the lowest id not yet used, counting up from
/// [`FIRST_ACCOUNT_ID`]. Given the same entry order and taken set, the
/// result is always the same.
pub fn build_plan(
    entries: Vec<LegacyAccountEntry>,
    taken: &BTreeSet<u32>,
) -> MigrationPlan {
    let adopted = taken
        .iter()
        .map(|&id| RegistryEntry::for_id(id))
        .collect::<Vec<_>>();

    let mut assignments = Vec::with_capacity(entries.len());
    let mut next = FIRST_ACCOUNT_ID;
    for entry in entries {
        while taken.contains(&next) {
            next += 1;
        }
        assignments.push(PlannedMigration { id: next, entry });
        next += 1;
    }

    MigrationPlan {
        assignments,
        adopted,
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;

    fn entry(name: &str) -> LegacyAccountEntry {
        LegacyAccountEntry {
            folder_name: name.to_owned(),
            path: PathBuf::from("/root").join(name),
            address: crate::account::folder_name::decode(name).ok(),
        }
    }

    #[test]
    fn slot_names_are_canonical_decimals() {
        assert_eq!(Some(1), parse_slot_name("1"));
        assert_eq!(Some(42), parse_slot_name("42"));
        assert_eq!(Some(u32::MAX - 1), parse_slot_name("4294967294"));

        assert_eq!(None, parse_slot_name("0"));
        assert_eq!(None, parse_slot_name("007"));
        assert_eq!(None, parse_slot_name("+1"));
        assert_eq!(None, parse_slot_name("1x"));
        assert_eq!(None, parse_slot_name(""));
        // No id after this one would fit, so it is not a slot.
        assert_eq!(None, parse_slot_name("4294967295"));
        assert_eq!(None, parse_slot_name("99999999999"));
    }

    #[test]
    fn fresh_root_counts_up_from_one() {
        let plan = build_plan(
            vec![entry("a+40x"), entry("b+40x")],
            &BTreeSet::new(),
        );

        assert_eq!(
            vec![1, 2],
            plan.assignments.iter().map(|a| a.id).collect::<Vec<_>>()
        );
        assert!(plan.adopted.is_empty());
    }

    #[test]
    fn taken_ids_are_skipped_and_adopted() {
        let taken = [1, 3].iter().copied().collect::<BTreeSet<_>>();
        let plan = build_plan(
            vec![entry("x+40x"), entry("y+40x"), entry("z+40x")],
            &taken,
        );

        assert_eq!(
            vec![2, 4, 5],
            plan.assignments.iter().map(|a| a.id).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![RegistryEntry::for_id(1), RegistryEntry::for_id(3)],
            plan.adopted
        );
    }

    #[test]
    fn scan_finds_only_nonempty_canonical_slots() {
        let root = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("1")).unwrap();
        std::fs::write(root.path().join("1/db.sqlite"), b"x").unwrap();
        // Empty slot; its move never started, so the id is reusable.
        std::fs::create_dir(root.path().join("2")).unwrap();
        // Non-canonical and non-directory names are not slots.
        std::fs::create_dir(root.path().join("007")).unwrap();
        std::fs::write(root.path().join("007/db.sqlite"), b"x").unwrap();
        std::fs::write(root.path().join("3"), b"not a dir").unwrap();
        std::fs::create_dir(root.path().join("user+40example.com")).unwrap();

        let taken = scan_taken_ids(root.path()).unwrap();
        assert_eq!(vec![1], taken.into_iter().collect::<Vec<_>>());
    }
}
