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

//! The migration entry point.
//!
//! Migration runs in one pass over the storage root:
//!
//! 1. Detect the layout. A root with a registry file, or with nothing
//!    recognisable in it, is left entirely alone.
//! 2. Enumerate legacy folders and plan an id for each, adopting numbered
//!    directories an interrupted earlier run left behind.
//! 3. Move each account's contents into its numbered directory.
//! 4. Write the registry. This is the commit point: the registry's presence
//!    is what stops the next run from migrating again. If nothing was
//!    migrated or adopted, no registry is written and a later run starts
//!    over.
//!
//! A run killed anywhere in the middle therefore leaves a root that the next
//! run picks up and finishes.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::account::model::{Layout, MigrationReport};
use crate::account::registry::{Registry, RegistryEntry};
use crate::account::{detect, enumerate, execute, plan};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

/// A storage root and the operations the client runs against it at startup.
pub struct AccountStore {
    log_prefix: LogPrefix,
    root: PathBuf,
}

impl AccountStore {
    pub fn new(log_prefix: LogPrefix, root: PathBuf) -> Self {
        AccountStore { log_prefix, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn detect_layout(&self) -> Result<Layout, Error> {
        detect::detect_layout(&self.root)
    }

    /// Brings the storage root into the numbered registry layout.
    ///
    /// Safe to call on every startup; when there is nothing to do, nothing
    /// is touched. `Err` is reserved for problems outside any single
    /// account's control (unreadable root, unwritable registry). One
    /// account failing to move is recorded in its outcome and the run
    /// carries on.
    pub fn migrate(&self) -> Result<MigrationReport, Error> {
        match self.detect_layout()? {
            Layout::AlreadyMigrated => {
                debug!(
                    "{} Registry already present; nothing to migrate",
                    self.log_prefix
                );
                Ok(MigrationReport::nothing_to_do())
            }
            Layout::EmptyOrUnknown => {
                debug!(
                    "{} No legacy account folders; nothing to migrate",
                    self.log_prefix
                );
                Ok(MigrationReport::nothing_to_do())
            }
            Layout::Legacy => self.migrate_legacy(),
        }
    }

    fn migrate_legacy(&self) -> Result<MigrationReport, Error> {
        info!(
            "{} Legacy account layout detected; beginning migration",
            self.log_prefix
        );

        let entries = enumerate::enumerate_legacy_accounts(
            &self.log_prefix,
            &self.root,
        )?;
        let taken = plan::scan_taken_ids(&self.root)?;
        let plan = plan::build_plan(entries, &taken);

        if !plan.adopted.is_empty() {
            info!(
                "{} Adopting {} numbered directories left by an \
                 interrupted earlier run",
                self.log_prefix,
                plan.adopted.len()
            );
        }

        let ids = plan.assignments.iter().map(|a| a.id).collect::<Vec<_>>();
        let outcomes = execute::execute_assignments(
            &self.log_prefix,
            &self.root,
            plan.assignments,
        );

        let mut registered = plan.adopted;
        for (&id, outcome) in ids.iter().zip(&outcomes) {
            if outcome.status.is_migrated() {
                registered.push(RegistryEntry::for_id(id));
            }
        }

        if registered.is_empty() {
            warn!(
                "{} No account made it into the new layout; not writing a \
                 registry so a later run can retry",
                self.log_prefix
            );
            return Ok(MigrationReport {
                migrated: false,
                outcomes,
            });
        }

        let registry = Registry::from_entries(registered);
        registry.store(&self.root)?;

        let n_failed =
            outcomes.iter().filter(|o| o.status.is_failed()).count();
        info!(
            "{} Migration finished: {} account(s) registered, {} failed",
            self.log_prefix,
            registry.accounts.len(),
            n_failed
        );

        Ok(MigrationReport {
            migrated: true,
            outcomes,
        })
    }
}
