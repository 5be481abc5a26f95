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

use std::fmt;
use std::sync::{Arc, Mutex};

/// Tracks text that should be included at the start of every log statement.
///
/// Clones of a `LogPrefix` share the same underlying data, so a task which
/// descends into a particular account can set the account once and have every
/// holder of the prefix pick it up.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Clone)]
struct Inner {
    task: String,
    account: Option<String>,
}

impl LogPrefix {
    pub fn new(task: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                task,
                account: None,
            })),
        }
    }

    /// Names the account folder currently being worked on.
    pub fn set_account(&self, account: String) {
        self.inner.lock().unwrap().account = Some(sanitise(account));
    }

    pub fn clear_account(&self) {
        self.inner.lock().unwrap().account = None;
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        write!(f, "{}", inner.task)?;
        if let Some(ref account) = inner.account {
            write!(f, "[{}]", account)?;
        }

        Ok(())
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefix_formatting() {
        let prefix = LogPrefix::new("migrate".to_owned());
        assert_eq!("migrate", prefix.to_string());

        prefix.set_account("user+40example.com".to_owned());
        assert_eq!("migrate[user+40example.com]", prefix.to_string());

        let clone = prefix.clone();
        clone.clear_account();
        assert_eq!("migrate", prefix.to_string());
    }

    #[test]
    fn account_names_are_sanitised() {
        let prefix = LogPrefix::new("migrate".to_owned());
        prefix.set_account("evil\r\nname".to_owned());
        assert_eq!("migrate[evilname]", prefix.to_string());
    }
}
