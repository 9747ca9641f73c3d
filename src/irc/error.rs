/* toy-ircd - a toy IRC server written in Rust
*  Copyright (C) 2026 the toy-ircd authors

*  This program is free software: you can redistribute it and/or modify
*  it under the terms of the GNU Lesser General Public License as
*  published by the Free Software Foundation, either version 3 of the
*  License, or (at your option) any later version.

*  This program is distributed in the hope that it will be useful,
*  but WITHOUT ANY WARRANTY; without even the implied warranty of
*  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
*  GNU Lesser General Public License for more details.

*  You should have received a copy of the GNU Lesser General Public License
*  along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
use std::{error, fmt};

/// Failures the coordinator can answer a request with. The driver maps
/// these onto the numeric replies of the command that triggered them;
/// `Display` exists for the log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    NoSuchNick(String),
    NoSuchChannel(String),
    NicknameInUse(String),
    NotOnChannel(String),
    // the coordinator task is gone or answered outside the documented
    // set; fatal for the current command only
    Server,
}

impl error::Error for Error {}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoSuchNick(nick) => write!(f, "401 {} :No such nick/channel", nick),
            Error::NoSuchChannel(chan) => write!(f, "403 {} :No such channel", chan),
            Error::NicknameInUse(nick) => write!(f, "433 {} :Nickname is already in use", nick),
            Error::NotOnChannel(chan) => write!(f, "441 {} :You're not on that channel", chan),
            Error::Server => write!(f, "server unavailable"),
        }
    }
}
