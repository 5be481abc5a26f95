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

use super::main::StatusSubcommand;
use crate::account::model::Layout;
use crate::account::registry::Registry;
use crate::account::{detect, enumerate};
use crate::support::log_prefix::LogPrefix;
use crate::support::sysexits::*;

pub(super) fn main(cmd: StatusSubcommand) {
    super::main::init_logging(cmd.common.verbose);

    let root = super::main::canonicalise(cmd.common.root);
    let layout = match detect::detect_layout(&root) {
        Ok(layout) => layout,
        Err(e) => die!(
            super::main::exit_code_for(&e),
            "Cannot inspect '{}': {}",
            root.display(),
            e
        ),
    };

    match layout {
        Layout::AlreadyMigrated => registry_status(&root),
        Layout::Legacy => legacy_status(&root),
        Layout::EmptyOrUnknown => {
            println!("{}: no account data", root.display());
        }
    }
}

fn registry_status(root: &Path) {
    let registry = match Registry::load(root) {
        Ok(registry) => registry,
        Err(e) => die!(
            EX_DATAERR,
            "Account registry under '{}' is unreadable: {}",
            root.display(),
            e
        ),
    };

    println!("{}: migrated", root.display());
    println!("selected account: {}", registry.selected_account);
    println!("next id: {}", registry.next_id);
    for account in &registry.accounts {
        println!("account {}: {}", account.id, account.dir);
    }
}

fn legacy_status(root: &Path) {
    let log_prefix = LogPrefix::new("status".to_owned());
    let entries = match enumerate::enumerate_legacy_accounts(&log_prefix, root)
    {
        Ok(entries) => entries,
        Err(e) => die!(
            super::main::exit_code_for(&e),
            "Cannot list '{}': {}",
            root.display(),
            e
        ),
    };

    println!(
        "{}: legacy, {} account folder(s) to migrate",
        root.display(),
        entries.len()
    );
    for entry in &entries {
        match entry.address {
            Some(ref address) => {
                println!("{} ({})", entry.folder_name, address);
            }
            None => println!("{} (address unknown)", entry.folder_name),
        }
    }
}
