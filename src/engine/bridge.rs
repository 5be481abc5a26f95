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

//! Message framing over the engine subprocess's standard I/O.
//!
//! The messaging engine is a separate executable speaking a line-delimited
//! protocol on its stdio. This module owns the subprocess and the framing:
//! outgoing messages are written as single lines, incoming bytes are
//! buffered and dispatched one complete frame at a time. What the lines
//! mean is entirely between the engine and the caller.

use std::ffi::OsStr;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;

use log::{debug, warn};

use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

pub struct EngineBridge {
    log_prefix: LogPrefix,
    child: process::Child,
    stdin: Option<process::ChildStdin>,
    stdout: process::ChildStdout,
    buffer: Vec<u8>,
}

impl EngineBridge {
    /// Starts the engine executable `program` pointed at the storage root.
    pub fn spawn(
        log_prefix: LogPrefix,
        program: impl AsRef<OsStr>,
        root: &Path,
    ) -> Result<Self, Error> {
        let mut command = process::Command::new(program);
        command.arg(root);
        Self::from_command(log_prefix, command)
    }

    fn from_command(
        log_prefix: LogPrefix,
        mut command: process::Command,
    ) -> Result<Self, Error> {
        debug!("{} Starting engine process", log_prefix);
        let mut child = command
            .stdin(process::Stdio::piped())
            .stdout(process::Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "engine stdout was not captured",
                )
                .into())
            }
        };

        Ok(EngineBridge {
            log_prefix,
            child,
            stdin,
            stdout,
            buffer: Vec::new(),
        })
    }

    /// Sends one message to the engine as a single line.
    ///
    /// Fire-and-forget; whatever the engine says in response comes back
    /// through `pump` like any other frame.
    pub fn send(&mut self, message: &str) -> Result<(), Error> {
        let stdin = match self.stdin {
            Some(ref mut stdin) => stdin,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "engine input already closed",
                )
                .into())
            }
        };

        stdin.write_all(message.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    /// Closes the engine's input, letting it see end-of-file.
    pub fn close_input(&mut self) {
        self.stdin = None;
    }

    /// Reads engine output until it exits, handing each complete frame to
    /// `on_message`.
    ///
    /// Frames are terminated by `\n` (a trailing `\r` is stripped) and may
    /// arrive split across arbitrary read boundaries. A frame that is not
    /// valid UTF-8, or bytes left unterminated when the engine exits, are
    /// dropped with a warning. An unsuccessful exit status is an error;
    /// callers that are done sending should `close_input` first or the
    /// engine may wait forever for more input.
    pub fn pump(
        mut self,
        mut on_message: impl FnMut(&str),
    ) -> Result<(), Error> {
        let mut read_buf = [0u8; 8192];
        loop {
            let nread = match self.stdout.read(&mut read_buf) {
                Ok(0) => break,
                Ok(nread) => nread,
                Err(e) if io::ErrorKind::Interrupted == e.kind() => continue,
                Err(e) => return Err(e.into()),
            };
            self.buffer.extend_from_slice(&read_buf[..nread]);

            let mut start = 0;
            while let Some(lf) = memchr::memchr(b'\n', &self.buffer[start..])
            {
                let mut end = start + lf;
                if end > start && b'\r' == self.buffer[end - 1] {
                    end -= 1;
                }

                match std::str::from_utf8(&self.buffer[start..end]) {
                    Ok(frame) => on_message(frame),
                    Err(_) => warn!(
                        "{} Discarding non-UTF-8 frame from the engine",
                        self.log_prefix
                    ),
                }

                start += lf + 1;
            }
            self.buffer.drain(..start);
        }

        if !self.buffer.is_empty() {
            warn!(
                "{} Engine exited mid-frame; discarding {} buffered bytes",
                self.log_prefix,
                self.buffer.len()
            );
        }

        let status = self.child.wait()?;
        debug!("{} Engine process exited: {}", self.log_prefix, status);
        if status.success() {
            Ok(())
        } else {
            Err(Error::EngineExit(status))
        }
    }
}
