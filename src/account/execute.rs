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

//! The physical part of the migration: moving folder contents around.

use std::fs;
use std::io::{self, Read};
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use log::{debug, error, info, warn};

use crate::account::model::{MigrationOutcome, MigrationStatus, ACCOUNT_DB};
use crate::account::plan::PlannedMigration;
use crate::support::error::Error;
use crate::support::file_ops::{self, IgnoreKinds};
use crate::support::log_prefix::LogPrefix;

/// Per-account settings file the legacy clients kept next to the database.
const SETTINGS_FILE: &str = "settings.toml";
/// Blob directory the engine expects next to the database.
const BLOB_DIR: &str = "db.sqlite-blobs";
/// Finder droppings; deleted so the emptied legacy folder can be removed.
const OS_METADATA: &str = ".DS_Store";

/// The settings keys that hold paths and participate in rewriting.
const PATH_SETTINGS: &[&str] = &["dbfile", "blobdir"];

/// Carries out `assignments` one account at a time.
///
/// A failure confines itself to its own account: the error is recorded in
/// that account's outcome, its legacy folder stays where it was, and the
/// run moves on to the next account.
pub fn execute_assignments(
    log_prefix: &LogPrefix,
    root: &Path,
    assignments: Vec<PlannedMigration>,
) -> Vec<MigrationOutcome> {
    let mut outcomes = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        log_prefix.set_account(assignment.entry.folder_name.clone());
        let status = match migrate_account(log_prefix, root, &assignment) {
            Ok(status) => status,
            Err(e) => {
                error!(
                    "{} Couldn't migrate this account; leaving its folder \
                     in place: {}",
                    log_prefix, e
                );
                MigrationStatus::Failed(e)
            }
        };
        outcomes.push(MigrationOutcome {
            entry: assignment.entry,
            status,
        });
    }
    log_prefix.clear_account();

    outcomes
}

fn migrate_account(
    log_prefix: &LogPrefix,
    root: &Path,
    assignment: &PlannedMigration,
) -> Result<MigrationStatus, Error> {
    let src = &assignment.entry.path;
    if fs::read_dir(src)?.next().is_none() {
        fs::remove_dir(src)?;
        info!("{} Legacy folder was empty; removed it", log_prefix);
        return Ok(MigrationStatus::Skipped);
    }

    let dest = root.join(assignment.id.to_string());
    debug!("{} Moving contents into '{}'", log_prefix, dest.display());
    fs::DirBuilder::new()
        .mode(0o700)
        .create(&dest)
        .ignore_already_exists()?;
    file_ops::move_dir_contents(src, &dest)?;
    ensure_blob_dir(&dest)?;
    rewrite_stored_paths(log_prefix, src, &dest)?;
    remove_legacy_folder(log_prefix, src);

    info!("{} Migrated to account {}", log_prefix, assignment.id);
    Ok(MigrationStatus::Migrated)
}

/// Old exports sometimes carry the database without its blob directory, and
/// the engine refuses to open such an account. Create the directory when
/// it is missing.
fn ensure_blob_dir(dest: &Path) -> io::Result<()> {
    if dest.join(ACCOUNT_DB).is_file() {
        fs::DirBuilder::new()
            .mode(0o700)
            .create(dest.join(BLOB_DIR))
            .ignore_already_exists()?;
    }

    Ok(())
}

/// Rewrites absolute paths stored in the per-account settings file.
///
/// The legacy clients recorded `dbfile` and `blobdir` as absolute paths.
/// After the move those values would dangle, so any of them that pointed
/// inside the old folder becomes a path relative to the new account
/// directory. Other values, and files that don't parse as TOML at all, are
/// left untouched; the settings file is the account's data, not ours.
fn rewrite_stored_paths(
    log_prefix: &LogPrefix,
    old_root: &Path,
    dest: &Path,
) -> Result<(), Error> {
    let path = dest.join(SETTINGS_FILE);
    let mut data = Vec::new();
    match fs::File::open(&path) {
        Ok(mut file) => {
            file.read_to_end(&mut data)?;
        }
        Err(e) if io::ErrorKind::NotFound == e.kind() => return Ok(()),
        Err(e) => return Err(e.into()),
    }

    let mut settings = match toml::from_slice::<toml::value::Table>(&data) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(
                "{} Not rewriting paths in {}; it doesn't parse: {}",
                log_prefix, SETTINGS_FILE, e
            );
            return Ok(());
        }
    };

    let mut rewrote = false;
    for &key in PATH_SETTINGS {
        let value = match settings.get_mut(key) {
            Some(value) => value,
            None => continue,
        };
        let stored = match value.as_str() {
            Some(stored) => stored,
            None => continue,
        };

        if !Path::new(stored).is_absolute() {
            continue;
        }

        match Path::new(stored).strip_prefix(old_root) {
            Ok(relative) => {
                let relative = if relative.as_os_str().is_empty() {
                    ".".to_owned()
                } else {
                    relative.to_string_lossy().into_owned()
                };
                debug!(
                    "{} Rewriting {} '{}' -> '{}'",
                    log_prefix, key, stored, relative
                );
                *value = toml::Value::String(relative);
                rewrote = true;
            }
            Err(_) => {
                warn!(
                    "{} {} in {} points outside the old account folder; \
                     leaving it alone: '{}'",
                    log_prefix, key, SETTINGS_FILE, stored
                );
            }
        }
    }

    if rewrote {
        let data = toml::to_vec(&settings)?;
        file_ops::spit(dest, &path, true, 0o600, &data)?;
    }

    Ok(())
}

/// Removes the emptied legacy folder, clearing out OS metadata files first.
///
/// Failure here leaves a harmless empty directory behind, so it only rates
/// a warning.
fn remove_legacy_folder(log_prefix: &LogPrefix, src: &Path) {
    let _ = fs::remove_file(src.join(OS_METADATA));
    if let Err(e) = fs::remove_dir(src) {
        warn!(
            "{} Couldn't remove the emptied legacy folder: {}",
            log_prefix, e
        );
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::*;
    use crate::account::enumerate::enumerate_legacy_accounts;
    use crate::account::plan::build_plan;

    fn prefix() -> LogPrefix {
        LogPrefix::new("execute".to_owned())
    }

    fn plan_for(root: &Path) -> Vec<PlannedMigration> {
        let entries = enumerate_legacy_accounts(&prefix(), root).unwrap();
        build_plan(entries, &BTreeSet::new()).assignments
    }

    #[test]
    fn moves_contents_and_removes_legacy_folder() {
        let root = tempfile::TempDir::new().unwrap();
        let legacy = root.path().join("user+40example.com");
        fs::create_dir(&legacy).unwrap();
        fs::write(legacy.join(ACCOUNT_DB), b"database").unwrap();
        fs::create_dir(legacy.join(BLOB_DIR)).unwrap();
        fs::write(legacy.join(BLOB_DIR).join("blob"), b"blob").unwrap();
        fs::write(legacy.join(OS_METADATA), b"finder junk").unwrap();

        let outcomes =
            execute_assignments(&prefix(), root.path(), plan_for(root.path()));

        assert_eq!(1, outcomes.len());
        assert!(outcomes[0].status.is_migrated());
        assert!(!legacy.exists());

        let dest = root.path().join("1");
        assert_eq!(
            "database",
            fs::read_to_string(dest.join(ACCOUNT_DB)).unwrap()
        );
        assert_eq!(
            "blob",
            fs::read_to_string(dest.join(BLOB_DIR).join("blob")).unwrap()
        );
    }

    #[test]
    fn empty_folder_is_skipped_and_removed() {
        let root = tempfile::TempDir::new().unwrap();
        let legacy = root.path().join("empty+40example.com");
        fs::create_dir(&legacy).unwrap();

        let outcomes =
            execute_assignments(&prefix(), root.path(), plan_for(root.path()));

        assert_eq!(1, outcomes.len());
        assert_matches!(MigrationStatus::Skipped, &outcomes[0].status);
        assert!(!legacy.exists());
        assert!(!root.path().join("1").exists());
    }

    #[test]
    fn missing_blob_dir_is_created() {
        let root = tempfile::TempDir::new().unwrap();
        let legacy = root.path().join("user+40example.com");
        fs::create_dir(&legacy).unwrap();
        fs::write(legacy.join(ACCOUNT_DB), b"database").unwrap();

        execute_assignments(&prefix(), root.path(), plan_for(root.path()));

        assert!(root.path().join("1").join(BLOB_DIR).is_dir());
    }

    #[test]
    fn settings_paths_are_rewritten() {
        let root = tempfile::TempDir::new().unwrap();
        let legacy = root.path().join("user+40example.com");
        fs::create_dir(&legacy).unwrap();
        fs::write(legacy.join(ACCOUNT_DB), b"database").unwrap();
        fs::write(
            legacy.join(SETTINGS_FILE),
            format!(
                "addr = \"user@example.com\"\n\
                 dbfile = \"{0}/db.sqlite\"\n\
                 blobdir = \"{0}/db.sqlite-blobs\"\n\
                 imap_certificate = \"/etc/ssl/cert.pem\"\n",
                legacy.display()
            ),
        )
        .unwrap();

        let outcomes =
            execute_assignments(&prefix(), root.path(), plan_for(root.path()));
        assert!(outcomes[0].status.is_migrated());

        let rewritten =
            fs::read_to_string(root.path().join("1").join(SETTINGS_FILE))
                .unwrap();
        let settings =
            toml::from_str::<toml::value::Table>(&rewritten).unwrap();

        assert_eq!(
            Some("db.sqlite"),
            settings.get("dbfile").and_then(|v| v.as_str())
        );
        assert_eq!(
            Some("db.sqlite-blobs"),
            settings.get("blobdir").and_then(|v| v.as_str())
        );
        // Unrelated values ride along unchanged.
        assert_eq!(
            Some("user@example.com"),
            settings.get("addr").and_then(|v| v.as_str())
        );
        assert_eq!(
            Some("/etc/ssl/cert.pem"),
            settings.get("imap_certificate").and_then(|v| v.as_str())
        );
    }

    #[test]
    fn unparseable_settings_are_left_untouched() {
        let root = tempfile::TempDir::new().unwrap();
        let legacy = root.path().join("user+40example.com");
        fs::create_dir(&legacy).unwrap();
        fs::write(legacy.join(ACCOUNT_DB), b"database").unwrap();
        fs::write(legacy.join(SETTINGS_FILE), b"{ not toml ]").unwrap();

        let outcomes =
            execute_assignments(&prefix(), root.path(), plan_for(root.path()));
        assert!(outcomes[0].status.is_migrated());

        assert_eq!(
            "{ not toml ]",
            fs::read_to_string(root.path().join("1").join(SETTINGS_FILE))
                .unwrap()
        );
    }

    #[test]
    fn relative_settings_paths_pass_through() {
        let root = tempfile::TempDir::new().unwrap();
        let legacy = root.path().join("user+40example.com");
        fs::create_dir(&legacy).unwrap();
        fs::write(legacy.join(ACCOUNT_DB), b"database").unwrap();
        fs::write(legacy.join(SETTINGS_FILE), b"dbfile = \"db.sqlite\"\n")
            .unwrap();

        execute_assignments(&prefix(), root.path(), plan_for(root.path()));

        assert_eq!(
            "dbfile = \"db.sqlite\"\n",
            fs::read_to_string(root.path().join("1").join(SETTINGS_FILE))
                .unwrap()
        );
    }

    #[test]
    fn obstructed_destination_fails_the_one_account() {
        let root = tempfile::TempDir::new().unwrap();
        let legacy = root.path().join("user+40example.com");
        fs::create_dir(&legacy).unwrap();
        fs::write(legacy.join(ACCOUNT_DB), b"database").unwrap();
        // A plain file squatting on the id directory's name.
        fs::write(root.path().join("1"), b"squatter").unwrap();

        let outcomes =
            execute_assignments(&prefix(), root.path(), plan_for(root.path()));

        assert_eq!(1, outcomes.len());
        assert!(outcomes[0].status.is_failed());
        // The legacy folder must survive a failed migration.
        assert_eq!(
            "database",
            fs::read_to_string(legacy.join(ACCOUNT_DB)).unwrap()
        );
    }
}
