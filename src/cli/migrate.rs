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

use std::path::Path;

use log::info;

use super::main::MigrateSubcommand;
use crate::account::migrate::AccountStore;
use crate::account::model::Layout;
use crate::account::{detect, enumerate, plan};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::sysexits::*;

pub(super) fn main(cmd: MigrateSubcommand) {
    super::main::init_logging(cmd.common.verbose);

    let root = super::main::canonicalise(cmd.common.root);
    let log_prefix = LogPrefix::new("migrate".to_owned());

    if cmd.dry_run {
        dry_run(&log_prefix, &root);
        return;
    }

    let store = AccountStore::new(log_prefix, root);
    match store.migrate() {
        Ok(report) => {
            let failed = report
                .outcomes
                .iter()
                .filter(|o| o.status.is_failed())
                .count();
            if 0 != failed {
                // The failed folders are still in place; rerunning picks
                // them up again.
                EX_TEMPFAIL.exit()
            }
        }
        Err(e) => die!(
            super::main::exit_code_for(&e),
            "Migration of '{}' failed: {}",
            store.root().display(),
            e
        ),
    }
}

fn dry_run(log_prefix: &LogPrefix, root: &Path) {
    let layout = match detect::detect_layout(root) {
        Ok(layout) => layout,
        Err(e) => die!(
            super::main::exit_code_for(&e),
            "Cannot inspect '{}': {}",
            root.display(),
            e
        ),
    };

    match layout {
        Layout::AlreadyMigrated => info!(
            "{} '{}' already has an account registry; \
             a real run would change nothing",
            log_prefix,
            root.display()
        ),
        Layout::EmptyOrUnknown => info!(
            "{} '{}' holds no legacy account data; \
             a real run would change nothing",
            log_prefix,
            root.display()
        ),
        Layout::Legacy => {
            if let Err(e) = log_plan(log_prefix, root) {
                die!(
                    super::main::exit_code_for(&e),
                    "Cannot plan migration of '{}': {}",
                    root.display(),
                    e
                );
            }
        }
    }
}

fn log_plan(log_prefix: &LogPrefix, root: &Path) -> Result<(), Error> {
    let entries = enumerate::enumerate_legacy_accounts(log_prefix, root)?;
    let taken = plan::scan_taken_ids(root)?;
    let plan = plan::build_plan(entries, &taken);

    for adopted in &plan.adopted {
        info!(
            "{} Would keep already-migrated account {} at '{}'",
            log_prefix, adopted.id, adopted.dir
        );
    }

    for assignment in &plan.assignments {
        match assignment.entry.address {
            Some(ref address) => info!(
                "{} Would migrate '{}' ({}) to account {}",
                log_prefix,
                assignment.entry.folder_name,
                address,
                assignment.id
            ),
            None => info!(
                "{} Would migrate '{}' to account {}",
                log_prefix, assignment.entry.folder_name, assignment.id
            ),
        }
    }

    info!("{} Dry run only; nothing was changed", log_prefix);
    Ok(())
}
