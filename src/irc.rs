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
// irc - the shared-state coordinator
//
// all cross-connection state (the nickname directory, the channels,
// the connection counter) is owned by one task spawned in
// Server::spawn(). connection drivers talk to it over two mpsc
// channels and get their answers back on per-request oneshots, so
// every mutation is serialised and none of the record types need
// locks. pushes into other connections' outbound mailboxes are
// unbounded sends and can never block this task.
pub mod chan;
pub mod error;
pub mod message;
pub mod reply;

use crate::irc::chan::Channel;
use crate::irc::error::Error;
use crate::irc::reply::Reply;

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// The outbound mailbox of one connection: the writer task owns the
/// receiving end and drains it to the socket.
pub type Sink = mpsc::UnboundedSender<String>;

const COMMAND_BACKLOG: usize = 64;

/// Completes the NICK+USER handshake: binds the connection's identity
/// and its outbound sink into the user record claimed earlier.
pub struct Registration {
    pub nick: String,
    pub user: String,
    pub host: String,
    pub realname: String,
    pub sink: Sink,
}

// one variant per coordinator operation; each carries its typed
// arguments and the capacity-1 reply mailbox
enum Command {
    ConnectionOpened {
        reply: oneshot::Sender<()>,
    },
    ConnectionClosed {
        nick: String,
        reply: oneshot::Sender<()>,
    },
    Nick {
        nick: String,
        replaces: Option<String>,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Quit {
        nick: String,
        reason: String,
        reply: oneshot::Sender<()>,
    },
    Privmsg {
        target: String,
        line: String,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    NUsers {
        reply: oneshot::Sender<usize>,
    },
    NConnections {
        reply: oneshot::Sender<usize>,
    },
    GetHostName {
        nick: String,
        reply: oneshot::Sender<Result<String, Error>>,
    },
    GetRealName {
        nick: String,
        reply: oneshot::Sender<Result<String, Error>>,
    },
    Join {
        nick: String,
        chan: String,
        reply: oneshot::Sender<String>,
    },
    Part {
        nick: String,
        chan: String,
        reason: Option<String>,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Names {
        nick: String,
        chan: String,
        reply: oneshot::Sender<Result<(), Error>>,
    },
}

/// Cloneable handle to the coordinator; one per connection driver plus
/// one in the listener. Every method is a synchronous request/reply
/// round-trip from the caller's point of view.
#[derive(Clone)]
pub struct Server {
    name: Arc<str>,
    commands: mpsc::Sender<Command>,
    registrations: mpsc::Sender<Registration>,
}

impl Server {
    /// Spawn the coordinator task and hand back the first handle.
    pub fn spawn(name: &str) -> Server {
        let (commands, mut command_queue) = mpsc::channel(COMMAND_BACKLOG);
        let (registrations, mut registration_queue) = mpsc::channel(COMMAND_BACKLOG);
        let name: Arc<str> = Arc::from(name);
        let mut core = Core {
            name: Arc::clone(&name),
            users: HashMap::new(),
            channels: HashMap::new(),
            connections: 0,
        };
        tokio::spawn(async move {
            loop {
                // biased, registrations first: a driver queues its
                // Registration before any follow-up command, and this
                // keeps that order across the two channels
                tokio::select! {
                    biased;
                    registration = registration_queue.recv() => match registration {
                        Some(registration) => core.register(registration),
                        None => break,
                    },
                    command = command_queue.recv() => match command {
                        Some(command) => core.apply(command),
                        None => break,
                    },
                }
            }
            debug!("coordinator for {} shutting down", core.name);
        });
        Server {
            name,
            commands,
            registrations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, Error> {
        let (reply, response) = oneshot::channel();
        if self.commands.send(build(reply)).await.is_err() {
            return Err(Error::Server);
        }
        response.await.map_err(|_| Error::Server)
    }

    pub async fn connection_opened(&self) -> Result<(), Error> {
        self.request(|reply| Command::ConnectionOpened { reply }).await
    }

    /// `nick` may be empty if the connection never claimed one.
    pub async fn connection_closed(&self, nick: &str) -> Result<(), Error> {
        let nick = nick.to_string();
        self.request(move |reply| Command::ConnectionClosed { nick, reply })
            .await
    }

    /// Claim a nickname, releasing `replaces` (an earlier claim by the
    /// same connection) on success.
    pub async fn claim_nick(&self, nick: &str, replaces: Option<&str>) -> Result<(), Error> {
        let nick = nick.to_string();
        let replaces = replaces.map(str::to_string);
        self.request(move |reply| Command::Nick {
            nick,
            replaces,
            reply,
        })
        .await?
    }

    pub async fn quit(&self, nick: &str, reason: &str) -> Result<(), Error> {
        let nick = nick.to_string();
        let reason = reason.to_string();
        self.request(move |reply| Command::Quit { nick, reason, reply })
            .await
    }

    /// Deliver one pre-formatted line to a nickname or a channel.
    pub async fn privmsg(&self, target: &str, line: String) -> Result<(), Error> {
        let target = target.to_string();
        self.request(move |reply| Command::Privmsg {
            target,
            line,
            reply,
        })
        .await?
    }

    pub async fn user_count(&self) -> Result<usize, Error> {
        self.request(|reply| Command::NUsers { reply }).await
    }

    pub async fn connection_count(&self) -> Result<usize, Error> {
        self.request(|reply| Command::NConnections { reply }).await
    }

    pub async fn host_name(&self, nick: &str) -> Result<String, Error> {
        let nick = nick.to_string();
        self.request(move |reply| Command::GetHostName { nick, reply })
            .await?
    }

    pub async fn real_name(&self, nick: &str) -> Result<String, Error> {
        let nick = nick.to_string();
        self.request(move |reply| Command::GetRealName { nick, reply })
            .await?
    }

    /// Join a channel, creating it on demand; comes back with the
    /// sorted member list for RPL_NAMREPLY.
    pub async fn join(&self, nick: &str, chan: &str) -> Result<String, Error> {
        let nick = nick.to_string();
        let chan = chan.to_string();
        self.request(move |reply| Command::Join { nick, chan, reply })
            .await
    }

    pub async fn part(
        &self,
        nick: &str,
        chan: &str,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        let nick = nick.to_string();
        let chan = chan.to_string();
        let reason = reason.map(str::to_string);
        self.request(move |reply| Command::Part {
            nick,
            chan,
            reason,
            reply,
        })
        .await?
    }

    /// Push RPL_NAMREPLY/RPL_ENDOFNAMES for a channel straight into the
    /// caller's own sink.
    pub async fn names(&self, nick: &str, chan: &str) -> Result<(), Error> {
        let nick = nick.to_string();
        let chan = chan.to_string();
        self.request(move |reply| Command::Names { nick, chan, reply })
            .await?
    }

    pub async fn register(&self, registration: Registration) -> Result<(), Error> {
        self.registrations
            .send(registration)
            .await
            .map_err(|_| Error::Server)
    }
}

#[derive(Default)]
struct UserRecord {
    user: String,
    host: String,
    realname: String,
    // bound by Registration once the handshake completes; a record
    // without a sink is a claimed-but-unregistered nickname
    sink: Option<Sink>,
}

impl UserRecord {
    fn registered(&self) -> bool {
        self.sink.is_some()
    }

    fn push(&self, nick: &str, line: &str) {
        if let Some(sink) = &self.sink {
            if sink.send(line.to_string()).is_err() {
                // the writer already went away; CONNECTION_CLOSED will
                // reclaim the record shortly
                debug!("dropping line for {}, writer is gone", nick);
            }
        }
    }
}

// the single-writer interior; only the coordinator task touches this
struct Core {
    name: Arc<str>,
    users: HashMap<String, UserRecord>,
    channels: HashMap<String, Channel>,
    connections: usize,
}

impl Core {
    fn apply(&mut self, command: Command) {
        match command {
            Command::ConnectionOpened { reply } => {
                self.connections += 1;
                let _ = reply.send(());
            }
            Command::ConnectionClosed { nick, reply } => {
                if !nick.is_empty() {
                    self.remove_user(&nick, "Client Quit");
                }
                self.connections = self.connections.saturating_sub(1);
                let _ = reply.send(());
            }
            Command::Nick {
                nick,
                replaces,
                reply,
            } => {
                let _ = reply.send(self.claim_nick(nick, replaces));
            }
            Command::Quit { nick, reason, reply } => {
                self.remove_user(&nick, &reason);
                let _ = reply.send(());
            }
            Command::Privmsg {
                target,
                line,
                reply,
            } => {
                let _ = reply.send(self.deliver(&target, &line));
            }
            Command::NUsers { reply } => {
                let registered = self.users.values().filter(|user| user.registered()).count();
                let _ = reply.send(registered);
            }
            Command::NConnections { reply } => {
                let _ = reply.send(self.connections);
            }
            Command::GetHostName { nick, reply } => {
                let _ = reply.send(self.lookup(&nick, |user| user.host.clone()));
            }
            Command::GetRealName { nick, reply } => {
                let _ = reply.send(self.lookup(&nick, |user| user.realname.clone()));
            }
            Command::Join { nick, chan, reply } => {
                let _ = reply.send(self.join(&nick, &chan));
            }
            Command::Part {
                nick,
                chan,
                reason,
                reply,
            } => {
                let _ = reply.send(self.part(&nick, &chan, reason.as_deref()));
            }
            Command::Names { nick, chan, reply } => {
                let _ = reply.send(self.names(&nick, &chan));
            }
        }
    }

    fn register(&mut self, registration: Registration) {
        match self.users.get_mut(&registration.nick) {
            Some(record) => {
                record.user = registration.user;
                record.host = registration.host;
                record.realname = registration.realname;
                record.sink = Some(registration.sink);
            }
            // the claim must come first; a registration without one is
            // a driver bug
            None => warn!("registration for unclaimed nick {}", registration.nick),
        }
    }

    fn lookup<T>(&self, nick: &str, field: impl Fn(&UserRecord) -> T) -> Result<T, Error> {
        match self.users.get(nick) {
            Some(user) => Ok(field(user)),
            None => Err(Error::NoSuchNick(nick.to_string())),
        }
    }

    fn claim_nick(&mut self, nick: String, replaces: Option<String>) -> Result<(), Error> {
        // uniqueness is the first test on every claim; re-claiming
        // your own current name is a no-op rather than a collision
        if self.users.contains_key(&nick) {
            if replaces.as_deref() == Some(nick.as_str()) {
                return Ok(());
            }
            return Err(Error::NicknameInUse(nick));
        }
        match replaces {
            Some(old) => {
                // move the record and every channel membership over in
                // one step, so lookups under the old nick fail from
                // here on and the new nick answers immediately
                let record = self.users.remove(&old).unwrap_or_default();
                for chan in self.channels.values_mut() {
                    chan.rename(&old, &nick);
                }
                self.users.insert(nick, record);
            }
            None => {
                self.users.insert(nick, UserRecord::default());
            }
        }
        Ok(())
    }

    /// Drop a user: notify every channel they were in, unlink them, and
    /// garbage-collect channels that emptied. The user's own connection
    /// is not notified (their driver is already sending ERROR or gone).
    fn remove_user(&mut self, nick: &str, reason: &str) {
        let record = match self.users.remove(nick) {
            Some(record) => record,
            None => return,
        };
        if !record.registered() {
            return;
        }
        let line = format!(":{}!{}@{} QUIT :{}\r\n", nick, record.user, record.host, reason);
        for chan in self.channels.values_mut() {
            if chan.remove(nick) {
                for member in chan.nicks() {
                    if let Some(target) = self.users.get(member) {
                        target.push(member, &line);
                    }
                }
            }
        }
        self.channels.retain(|_, chan| !chan.is_empty());
    }

    fn deliver(&self, target: &str, line: &str) -> Result<(), Error> {
        if chan::is_channel_name(target) {
            // absent channel deliberately answers 401, not 403
            let chan = match self.channels.get(target) {
                Some(chan) => chan,
                None => return Err(Error::NoSuchNick(target.to_string())),
            };
            for member in chan.nicks() {
                if let Some(user) = self.users.get(member) {
                    user.push(member, line);
                }
            }
            Ok(())
        } else {
            match self.users.get(target) {
                Some(user) => {
                    user.push(target, line);
                    Ok(())
                }
                None => Err(Error::NoSuchNick(target.to_string())),
            }
        }
    }

    fn join(&mut self, nick: &str, chan_name: &str) -> String {
        let (user, host) = match self.users.get(nick) {
            Some(record) => (record.user.clone(), record.host.clone()),
            None => (String::new(), String::new()),
        };
        let line = format!(":{}!{}@{} JOIN {}\r\n", nick, user, host, chan_name);
        let chan = self
            .channels
            .entry(chan_name.to_string())
            .or_insert_with(Channel::new);
        chan.join(nick);
        // everyone hears about it, the joiner included; their own echo
        // arrives ahead of the topic/names lines the driver appends
        for member in chan.nicks() {
            if let Some(target) = self.users.get(member) {
                target.push(member, &line);
            }
        }
        chan.member_list()
    }

    fn part(&mut self, nick: &str, chan_name: &str, reason: Option<&str>) -> Result<(), Error> {
        let (user, host) = match self.users.get(nick) {
            Some(record) => (record.user.clone(), record.host.clone()),
            None => (String::new(), String::new()),
        };
        let chan = match self.channels.get_mut(chan_name) {
            Some(chan) => chan,
            None => return Err(Error::NoSuchChannel(chan_name.to_string())),
        };
        if !chan.contains(nick) {
            return Err(Error::NotOnChannel(chan_name.to_string()));
        }
        let line = match reason {
            Some(msg) => format!(":{}!{}@{} PART {} :{}\r\n", nick, user, host, chan_name, msg),
            None => format!(":{}!{}@{} PART {}\r\n", nick, user, host, chan_name),
        };
        // broadcast first so the parting member sees their own echo,
        // then unlink them and drop the channel once it empties
        for member in chan.nicks() {
            if let Some(target) = self.users.get(member) {
                target.push(member, &line);
            }
        }
        chan.remove(nick);
        if chan.is_empty() {
            self.channels.remove(chan_name);
        }
        Ok(())
    }

    fn names(&mut self, nick: &str, chan_name: &str) -> Result<(), Error> {
        let caller = match self.users.get(nick) {
            Some(user) => user,
            None => return Err(Error::NoSuchNick(nick.to_string())),
        };
        match self.channels.get(chan_name) {
            Some(chan) => {
                let names = Reply::NamReply {
                    chan: chan_name.to_string(),
                    members: chan.member_list(),
                };
                caller.push(nick, &names.format(&self.name, nick));
                let end = Reply::EndOfNames {
                    chan: chan_name.to_string(),
                };
                caller.push(nick, &end.format(&self.name, nick));
                Ok(())
            }
            None => {
                let end = Reply::EndOfNames {
                    chan: chan_name.to_string(),
                };
                caller.push(nick, &end.format(&self.name, nick));
                Err(Error::NoSuchChannel(chan_name.to_string()))
            }
        }
    }
}
