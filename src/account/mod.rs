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

//! Everything concerning the on-disk account store.
//!
//! The legacy layout kept one folder per account, named after the escaped
//! address:
//!
//! ```text
//! <root>/
//!   user+40example.com/
//!     db.sqlite
//!     db.sqlite-blobs/
//!   work+40example.org/
//!     ...
//! ```
//!
//! The current layout numbers the accounts and records them in a registry:
//!
//! ```text
//! <root>/
//!   accounts.toml
//!   1/
//!     db.sqlite
//!     db.sqlite-blobs/
//!   2/
//!     ...
//! ```
//!
//! [`migrate::AccountStore::migrate`] converts the former into the latter.

pub mod detect;
pub mod enumerate;
pub mod execute;
pub mod folder_name;
pub mod migrate;
pub mod model;
pub mod plan;
pub mod registry;
