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

/* advertised in 002/003/004; none of these are real yet */
pub const VERSION: &str = "0.0";
pub const CREATION_DATE: &str = "01/01/1970";
pub const USER_MODES: &str = "0";
pub const CHANNEL_MODES: &str = "0";

/// Every line this server sends that is addressed to the requesting
/// connection itself. Relayed user traffic (PRIVMSG/NOTICE/JOIN/PART/QUIT
/// lines with a `nick!user@host` prefix) is formatted at the point of
/// dispatch instead, since it never depends on the recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    // 001..004, the welcome burst
    Welcome { user: String, host: String },
    YourHost,
    Created,
    MyInfo,
    // 251..255, the LUSERS block
    LuserClient { users: usize },
    LuserOp,
    LuserUnknown { unknown: usize },
    LuserChannels,
    LuserMe { clients: usize },
    // 311/312/318, WHOIS
    WhoisUser { target: String, host: String, realname: String },
    WhoisServer { target: String },
    EndOfWhois { target: String },
    // 332/353/366, channel joins
    Topic { chan: String },
    NamReply { chan: String, members: String },
    EndOfNames { chan: String },
    // error numerics
    NoSuchNick { target: String },
    NoSuchChannel { chan: String },
    NoRecipient,
    NoTextToSend,
    UnknownCommand { command: String },
    NoMotd,
    NoNicknameGiven,
    NicknameInUse { target: String },
    NotOnChannel { chan: String },
    NotRegistered,
    NeedMoreParams { command: String },
    AlreadyRegistered,
    // non-numeric lines
    ClosingLink { host: String, reason: String },
    NickChange { old: String, new: String },
    Pong { token: String },
    // some paths answer with a bare CR-LF; the tests depend on it
    Empty,
}

impl Reply {
    /// Render the exact wire bytes, CR-LF included. `nick` is the
    /// requesting connection's reply target: its nickname once
    /// registered, the literal `*` before that.
    pub fn format(&self, server: &str, nick: &str) -> String {
        match self {
            Reply::Welcome { user, host } => format!(
                ":{} 001 {} :Welcome to the Internet Relay Network {}!{}@{}\r\n",
                server, nick, nick, user, host
            ),
            Reply::YourHost => format!(
                ":{} 002 {} :Your host is {}, running version {}\r\n",
                server, nick, server, VERSION
            ),
            Reply::Created => format!(
                ":{} 003 {} :This server was created {}\r\n",
                server, nick, CREATION_DATE
            ),
            Reply::MyInfo => format!(
                ":{} 004 {} :{} {} {} {}\r\n",
                server, nick, server, VERSION, USER_MODES, CHANNEL_MODES
            ),
            Reply::LuserClient { users } => format!(
                ":{} 251 {} :There are {} users and 0 invisible on 0 servers\r\n",
                server, nick, users
            ),
            Reply::LuserOp => format!(":{} 252 {} 0 :operator(s) online\r\n", server, nick),
            Reply::LuserUnknown { unknown } => format!(
                ":{} 253 {} {} :unknown connection(s)\r\n",
                server, nick, unknown
            ),
            Reply::LuserChannels => format!(":{} 254 {} 0 :channels formed\r\n", server, nick),
            Reply::LuserMe { clients } => format!(
                ":{} 255 {} :I have {} clients and 0 servers\r\n",
                server, nick, clients
            ),
            Reply::WhoisUser { target, host, realname } => format!(
                ":{} 311 {} {} {} {} :{}\r\n",
                server, nick, target, target, host, realname
            ),
            Reply::WhoisServer { target } => format!(
                ":{} 312 {} {} {} :Toy server\r\n",
                server, nick, target, server
            ),
            Reply::EndOfWhois { target } => format!(
                ":{} 318 {} {} :End of /WHOIS list\r\n",
                server, nick, target
            ),
            Reply::Topic { chan } => format!(":{} 332 {} {} :Test\r\n", server, nick, chan),
            Reply::NamReply { chan, members } => format!(
                ":{} 353 {} = {} :{}\r\n",
                server, nick, chan, members
            ),
            Reply::EndOfNames { chan } => format!(
                ":{} 366 {} {} :End of /NAMES list\r\n",
                server, nick, chan
            ),
            Reply::NoSuchNick { target } => format!(
                ":{} 401 {} {} :No such nick/channel\r\n",
                server, nick, target
            ),
            Reply::NoSuchChannel { chan } => format!(
                ":{} 403 {} {} :No such channel\r\n",
                server, nick, chan
            ),
            Reply::NoRecipient => format!(
                ":{} 411 {} :No recipient given (PRIVMSG)\r\n",
                server, nick
            ),
            Reply::NoTextToSend => format!(":{} 412 {} :No text to send\r\n", server, nick),
            Reply::UnknownCommand { command } => format!(
                ":{} 421 {} {} :Unknown command\r\n",
                server, nick, command
            ),
            Reply::NoMotd => format!(":{} 422 {} :MOTD not implemented\r\n", server, nick),
            Reply::NoNicknameGiven => format!(":{} 431 {} :No nickname given\r\n", server, nick),
            Reply::NicknameInUse { target } => format!(
                ":{} 433 {} {} :Nickname is already in use\r\n",
                server, nick, target
            ),
            Reply::NotOnChannel { chan } => format!(
                ":{} 441 {} {} :You're not on that channel\r\n",
                server, nick, chan
            ),
            Reply::NotRegistered => format!(":{} 451 {} :You have not registered\r\n", server, nick),
            Reply::NeedMoreParams { command } => format!(
                ":{} 461 {} {} :Not enough parameters\r\n",
                server, nick, command
            ),
            Reply::AlreadyRegistered => format!(
                ":{} 462 {} :Unauthorized command (already registered)\r\n",
                server, nick
            ),
            Reply::ClosingLink { host, reason } => format!(
                ":{} ERROR :Closing Link: {} {}\r\n",
                server, host, reason
            ),
            Reply::NickChange { old, new } => format!(":{} NICK {}\r\n", old, new),
            Reply::Pong { token } => format!(":{} PONG {} {}\r\n", server, server, token),
            Reply::Empty => String::from("\r\n"),
        }
    }
}
