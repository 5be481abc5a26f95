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

//! Miscellaneous functions for working with files.

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{symlink, DirBuilderExt, PermissionsExt};
use std::path::Path;

/// Write `data` into the file at `path`, atomically.
///
/// The file will first be staged within `tmp`, which must be on the same file
/// system as `path` for the final rename to work.
///
/// If `overwrite` is true, this will replace anything already at `path`. If
/// false, the call will fail if `path` already exists.
pub fn spit(
    tmp: impl AsRef<Path>,
    path: impl AsRef<Path>,
    overwrite: bool,
    mode: u32,
    data: &[u8],
) -> io::Result<()> {
    let mut tf = tempfile::NamedTempFile::new_in(tmp)?;
    tf.as_file_mut().write_all(data)?;
    chmod(tf.path(), mode)?;
    tf.as_file_mut().sync_all()?;
    if overwrite {
        tf.persist(path)?;
    } else {
        tf.persist_noclobber(path)?;
    }
    Ok(())
}

pub fn chmod(path: impl AsRef<Path>, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Move every child of `src` into `dst`, which must already exist.
///
/// Children are moved by `rename()` where possible. If `src` and `dst` are on
/// different file systems, each child is copied, verified, and only then
/// removed from `src`. A child directory which already exists under `dst` is
/// merged recursively, with individual files on the `src` side replacing
/// their counterparts.
///
/// `src` itself is left in place (empty on success).
pub fn move_dir_contents(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        move_entry(&entry.path(), &dst.join(entry.file_name()))?;
    }
    Ok(())
}

/// Move the single file system object at `src` to `dst`, with the same
/// cross-device and merge handling as `move_dir_contents`.
pub fn move_entry(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if Some(nix::libc::EXDEV) == e.raw_os_error() => {
            copy_then_delete(src, dst)
        }
        Err(e)
            if is_nonempty_dir_collision(&e)
                && src.is_dir()
                && dst.is_dir() =>
        {
            move_dir_contents(src, dst)?;
            // src holds nothing we care about any more
            fs::remove_dir(src)
        }
        Err(e) => Err(e),
    }
}

/// `rename()` of a directory onto an existing non-empty directory.
///
/// POSIX says ENOTEMPTY; EEXIST is also allowed and some systems use it.
fn is_nonempty_dir_collision(e: &io::Error) -> bool {
    Some(nix::libc::ENOTEMPTY) == e.raw_os_error()
        || Some(nix::libc::EEXIST) == e.raw_os_error()
}

fn copy_then_delete(src: &Path, dst: &Path) -> io::Result<()> {
    copy_recursively(src, dst)?;
    if src.symlink_metadata()?.file_type().is_dir() {
        fs::remove_dir_all(src)
    } else {
        fs::remove_file(src)
    }
}

fn copy_recursively(src: &Path, dst: &Path) -> io::Result<()> {
    let md = src.symlink_metadata()?;
    let ft = md.file_type();

    if ft.is_dir() {
        fs::DirBuilder::new()
            .mode(md.permissions().mode() & 0o777)
            .create(dst)
            .ignore_already_exists()?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursively(&entry.path(), &dst.join(entry.file_name()))?;
        }
    } else if ft.is_symlink() {
        fs::remove_file(dst).ignore_not_found()?;
        symlink(fs::read_link(src)?, dst)?;
    } else {
        let src_len = md.len();
        fs::copy(src, dst)?;
        let dst_len = fs::metadata(dst)?.len();
        if src_len != dst_len {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "Short copy of '{}': {} bytes instead of {}",
                    src.display(),
                    dst_len,
                    src_len
                ),
            ));
        }
    }

    Ok(())
}

pub trait IgnoreKinds {
    fn ignore_already_exists(self) -> Self;
    fn ignore_not_found(self) -> Self;
}

impl<R: Default> IgnoreKinds for Result<R, io::Error> {
    fn ignore_already_exists(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                Ok(R::default())
            }
            Err(e) => Err(e),
        }
    }

    fn ignore_not_found(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::NotFound == e.kind() => Ok(R::default()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spit_overwrite_semantics() {
        let root = tempfile::TempDir::new().unwrap();
        let path = root.path().join("file");

        spit(root.path(), &path, false, 0o600, b"first").unwrap();
        assert_eq!("first", fs::read_to_string(&path).unwrap());

        assert!(spit(root.path(), &path, false, 0o600, b"second").is_err());
        assert_eq!("first", fs::read_to_string(&path).unwrap());

        spit(root.path(), &path, true, 0o600, b"third").unwrap();
        assert_eq!("third", fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn move_dir_contents_basic() {
        let root = tempfile::TempDir::new().unwrap();
        let src = root.path().join("src");
        let dst = root.path().join("dst");
        fs::create_dir(&src).unwrap();
        fs::create_dir(&dst).unwrap();

        fs::write(src.join("a"), b"a").unwrap();
        fs::create_dir(src.join("sub")).unwrap();
        fs::write(src.join("sub/b"), b"b").unwrap();

        move_dir_contents(&src, &dst).unwrap();

        assert_eq!("a", fs::read_to_string(dst.join("a")).unwrap());
        assert_eq!("b", fs::read_to_string(dst.join("sub/b")).unwrap());
        assert!(fs::read_dir(&src).unwrap().next().is_none());
    }

    #[test]
    fn move_dir_contents_merges_existing_dirs() {
        let root = tempfile::TempDir::new().unwrap();
        let src = root.path().join("src");
        let dst = root.path().join("dst");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::create_dir_all(dst.join("sub")).unwrap();

        fs::write(src.join("sub/new"), b"new").unwrap();
        fs::write(src.join("sub/both"), b"from src").unwrap();
        fs::write(dst.join("sub/both"), b"from dst").unwrap();
        fs::write(dst.join("sub/old"), b"old").unwrap();

        move_dir_contents(&src, &dst).unwrap();

        assert_eq!("new", fs::read_to_string(dst.join("sub/new")).unwrap());
        assert_eq!(
            "from src",
            fs::read_to_string(dst.join("sub/both")).unwrap()
        );
        assert_eq!("old", fs::read_to_string(dst.join("sub/old")).unwrap());
        assert!(!src.join("sub").exists());
    }

    #[test]
    fn copy_then_delete_verifies_and_removes() {
        let root = tempfile::TempDir::new().unwrap();
        let src = root.path().join("src");
        let dst = root.path().join("dst");
        fs::create_dir_all(src.join("deep/deeper")).unwrap();
        fs::write(src.join("deep/deeper/file"), b"payload").unwrap();

        copy_then_delete(&src, &dst).unwrap();

        assert_eq!(
            "payload",
            fs::read_to_string(dst.join("deep/deeper/file")).unwrap()
        );
        assert!(!src.exists());
    }
}
