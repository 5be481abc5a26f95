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

use std::io;
use std::path::PathBuf;

use structopt::StructOpt;

use crate::support::error::Error;
use crate::support::sysexits::*;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Migrate a legacy account root to the numbered registry layout.
    ///
    /// Older clients stored each account in a folder named after its
    /// escaped address. This command moves every such folder into a
    /// directory named by a small integer id and writes the accounts.toml
    /// registry the current engine expects.
    ///
    /// The migration is idempotent: once the registry exists, running it
    /// again does nothing. A run interrupted part way (crash, power loss)
    /// is picked up and completed by the next run. An account that cannot
    /// be migrated is skipped with an error and its folder left in place;
    /// this does not abort the rest of the batch.
    Migrate(MigrateSubcommand),
    /// Show what layout an account root currently has.
    ///
    /// Reports whether the root is already in the registry layout (and if
    /// so, which accounts are registered), still in the legacy layout, or
    /// holds nothing recognisable. Never changes anything on disk.
    Status(StatusSubcommand),
}

#[derive(StructOpt)]
pub(super) struct CommonOptions {
    /// The account storage root to operate on.
    #[structopt(parse(from_os_str))]
    pub(super) root: PathBuf,

    /// Log debugging detail.
    #[structopt(short, long)]
    pub(super) verbose: bool,
}

#[derive(StructOpt)]
pub(super) struct MigrateSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Log the migration plan without changing anything on disk.
    #[structopt(long)]
    pub(super) dry_run: bool,
}

#[derive(StructOpt)]
pub(super) struct StatusSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    match cmd {
        Command::Migrate(cmd) => super::migrate::main(cmd),
        Command::Status(cmd) => super::status::main(cmd),
    }
}

pub(super) fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    crate::init_simple_log(level);
}

/// Resolves the root the user gave us to its real location.
///
/// The settings rewrite compares paths stored inside accounts against the
/// folder's actual location, so symlinks and relative paths are resolved up
/// front. A root that doesn't exist is passed through; that simply becomes
/// "nothing to migrate".
pub(super) fn canonicalise(root: PathBuf) -> PathBuf {
    match root.canonicalize() {
        Ok(root) => root,
        Err(_) => root,
    }
}

pub(super) fn exit_code_for(e: &Error) -> Sysexit {
    match *e {
        Error::Io(ref e) if io::ErrorKind::NotFound == e.kind() => EX_NOINPUT,
        Error::Io(ref e) if io::ErrorKind::PermissionDenied == e.kind() => {
            EX_NOPERM
        }
        Error::Io(_) => EX_IOERR,
        Error::TomlDe(_) => EX_DATAERR,
        Error::TomlSer(_) => EX_SOFTWARE,
        Error::EngineExit(_) => EX_UNAVAILABLE,
    }
}
