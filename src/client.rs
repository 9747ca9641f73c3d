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
// client - the per-connection protocol driver
//
// two tasks per connection. the reader parses lines and dispatches
// them, talking to the coordinator for anything that crosses
// connections; the writer drains the outbound mailbox to the socket.
// every termination path (EOF, read error, write error, QUIT) funnels
// back through the reader, which reports CONNECTION_CLOSED with the
// final nickname and fires the quit signal.
use crate::io::{ReadHalfWrap, WriteHalfWrap};
use crate::irc::error::Error;
use crate::irc::message;
use crate::irc::reply::Reply;
use crate::irc::{Registration, Server, Sink};

use log::{debug, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{mpsc, Notify};

// in-process pipe buffer; plenty for line traffic
const PIPE_CAPACITY: usize = 16 * 1024;

/// Everything the driver owns about one connection. Only the reader
/// task ever touches this.
struct ConnState {
    host: String,
    nick: String,
    user: String,
    realname: String,
    quit: bool,
}

impl ConnState {
    fn new(host: String) -> ConnState {
        ConnState {
            host,
            nick: String::new(),
            user: String::new(),
            realname: String::new(),
            quit: false,
        }
    }

    // registration is complete once both halves of the handshake are in
    fn registered(&self) -> bool {
        !self.nick.is_empty() && !self.user.is_empty()
    }

    // numeric replies address the nickname once registered and the
    // literal `*` before that
    fn reply_target(&self) -> &str {
        if self.registered() {
            &self.nick
        } else {
            "*"
        }
    }
}

/// Drive an accepted TCP connection.
pub fn spawn(server: Server, socket: TcpStream, host: String) {
    let (read_half, write_half) = tokio::io::split(socket);
    run(
        server,
        ReadHalfWrap::ClearText(read_half),
        WriteHalfWrap::ClearText(write_half),
        host,
    );
}

/// Drive one end of an in-process pipe and hand the other end back;
/// this is how the test suites connect. Pipe connections carry the
/// fixed host label `pipe`.
pub fn spawn_pipe(server: &Server) -> DuplexStream {
    let (ours, theirs) = tokio::io::duplex(PIPE_CAPACITY);
    let (read_half, write_half) = tokio::io::split(ours);
    run(
        server.clone(),
        ReadHalfWrap::Pipe(read_half),
        WriteHalfWrap::Pipe(write_half),
        String::from("pipe"),
    );
    theirs
}

fn run(server: Server, read_half: ReadHalfWrap, write_half: WriteHalfWrap, host: String) {
    let (sink, mailbox) = mpsc::unbounded_channel();
    let quit = Arc::new(Notify::new());
    tokio::spawn(writer_task(write_half, mailbox, Arc::clone(&quit)));
    tokio::spawn(reader_task(server, read_half, host, sink, quit));
}

async fn reader_task(
    server: Server,
    read_half: ReadHalfWrap,
    host: String,
    sink: Sink,
    quit: Arc<Notify>,
) {
    if server.connection_opened().await.is_err() {
        quit.notify_one();
        return;
    }

    let mut state = ConnState::new(host);
    // cap each line at the protocol maximum; a client that exceeds it
    // looks like EOF below and gets disconnected
    let mut lines = BufReader::new(read_half).take(message::MAX_MSG_SIZE as u64);
    let mut line = String::new();
    loop {
        line.clear();
        lines.set_limit(message::MAX_MSG_SIZE as u64);
        tokio::select! {
            read = lines.read_line(&mut line) => match read {
                // a line without its terminator means EOF (or an
                // oversized message); either way the connection is done
                Ok(_) if !line.ends_with('\n') => break,
                Ok(_) => {
                    handle_message(&server, &mut state, &sink, &line).await;
                    if state.quit {
                        break;
                    }
                }
                Err(err) => {
                    debug!("read error from {}: {}", state.host, err);
                    break;
                }
            },
            // the writer hit an error and wants us gone
            _ = quit.notified() => break,
        }
    }

    if let Err(err) = server.connection_closed(&state.nick).await {
        debug!("connection close for {} not acknowledged: {}", state.host, err);
    }
    quit.notify_one();
}

async fn writer_task(
    mut write_half: WriteHalfWrap,
    mut mailbox: UnboundedReceiver<String>,
    quit: Arc<Notify>,
) {
    loop {
        // biased, mailbox first: queued lines (the QUIT ERROR line in
        // particular) flush before the quit signal closes the socket
        tokio::select! {
            biased;
            queued = mailbox.recv() => match queued {
                Some(line) => {
                    let written = async {
                        write_half.write_all(line.as_bytes()).await?;
                        write_half.flush().await
                    };
                    if let Err(err) = written.await {
                        debug!("write error: {}", err);
                        quit.notify_one();
                        break;
                    }
                }
                None => break,
            },
            _ = quit.notified() => break,
        }
    }
    let _ = write_half.shutdown().await;
}

// enqueue one reply line for this connection
fn respond(server: &Server, state: &ConnState, sink: &Sink, reply: Reply) {
    let line = reply.format(server.name(), state.reply_target());
    let _ = sink.send(line);
}

// an opcode answered outside its documented set; give up on this
// command but keep the connection
fn unexpected(verb: &str, err: Error) {
    warn!("unexpected coordinator reply to {}: {}", verb, err);
}

async fn handle_message(server: &Server, state: &mut ConnState, sink: &Sink, raw: &str) {
    let (command, params) = message::tokenize(raw);
    match command.as_str() {
        "NICK" => handle_nick(server, state, sink, &params).await,
        "USER" => handle_user(server, state, sink, &params).await,
        "QUIT" => handle_quit(server, state, sink, &params).await,
        "PRIVMSG" => handle_privmsg(server, state, sink, &params).await,
        "NOTICE" => handle_notice(server, state, sink, &params).await,
        "PING" => handle_ping(server, state, sink, &params),
        "PONG" => handle_pong(server, state, sink),
        "MOTD" => handle_motd(server, state, sink),
        "LUSERS" => handle_lusers(server, state, sink).await,
        "WHOIS" => handle_whois(server, state, sink, &params).await,
        "JOIN" => handle_join(server, state, sink, &params).await,
        "PART" => handle_part(server, state, sink, &params).await,
        // recognised but not implemented; the registration gate is
        // their entire observable behaviour
        "TOPIC" | "AWAY" | "NAMES" | "LIST" | "WHO" => handle_placeholder(server, state, sink),
        _ => respond(server, state, sink, Reply::UnknownCommand { command }),
    }
}

// every handler below except NICK and USER starts with this check
fn gate(server: &Server, state: &ConnState, sink: &Sink) -> bool {
    if state.registered() {
        return true;
    }
    respond(server, state, sink, Reply::NotRegistered);
    false
}

/* the NICK half of the handshake. the nickname is claimed from the
 * coordinator the moment it is offered, releasing any earlier claim by
 * this connection, so two connections can never hold the same name
 * even before USER arrives */
async fn handle_nick(server: &Server, state: &mut ConnState, sink: &Sink, params: &[String]) {
    let nick = match params.first() {
        Some(nick) => nick.as_str(),
        None => {
            respond(server, state, sink, Reply::NoNicknameGiven);
            return;
        }
    };

    if state.registered() {
        // a straight rename; the coordinator moves the record and the
        // channel memberships over
        match server.claim_nick(nick, Some(state.nick.as_str())).await {
            Ok(()) => {
                let old = std::mem::replace(&mut state.nick, nick.to_string());
                respond(
                    server,
                    state,
                    sink,
                    Reply::NickChange {
                        old,
                        new: nick.to_string(),
                    },
                );
            }
            Err(Error::NicknameInUse(_)) => {
                respond(
                    server,
                    state,
                    sink,
                    Reply::NicknameInUse {
                        target: nick.to_string(),
                    },
                );
            }
            Err(err) => unexpected("NICK", err),
        }
        return;
    }

    let prior = if state.nick.is_empty() {
        None
    } else {
        Some(state.nick.clone())
    };
    match server.claim_nick(nick, prior.as_deref()).await {
        Ok(()) => {
            state.nick = nick.to_string();
            if state.user.is_empty() {
                // half a handshake; nothing to say yet
                respond(server, state, sink, Reply::Empty);
            } else {
                complete_registration(server, state, sink).await;
            }
        }
        Err(Error::NicknameInUse(_)) => {
            // the offered name is rejected and the spare one is
            // dropped with it; this connection now holds no claim
            if let Some(prior) = prior {
                let _ = server.quit(&prior, "").await;
            }
            state.nick.clear();
            respond(
                server,
                state,
                sink,
                Reply::NicknameInUse {
                    target: nick.to_string(),
                },
            );
        }
        Err(err) => unexpected("NICK", err),
    }
}

async fn handle_user(server: &Server, state: &mut ConnState, sink: &Sink, params: &[String]) {
    if params.len() < 4 {
        respond(
            server,
            state,
            sink,
            Reply::NeedMoreParams {
                command: String::from("USER"),
            },
        );
        return;
    }
    if !state.user.is_empty() {
        respond(server, state, sink, Reply::AlreadyRegistered);
        return;
    }

    state.user = params[0].clone();
    state.realname = params[3].clone();

    if state.nick.is_empty() {
        respond(server, state, sink, Reply::Empty);
    } else {
        // the nickname was already claimed when NICK came in
        complete_registration(server, state, sink).await;
    }
}

/// Bind our identity and sink into the claimed user record, then greet.
async fn complete_registration(server: &Server, state: &ConnState, sink: &Sink) {
    let bound = server
        .register(Registration {
            nick: state.nick.clone(),
            user: state.user.clone(),
            host: state.host.clone(),
            realname: state.realname.clone(),
            sink: sink.clone(),
        })
        .await;
    if let Err(err) = bound {
        unexpected("USER", err);
        return;
    }
    respond(
        server,
        state,
        sink,
        Reply::Welcome {
            user: state.user.clone(),
            host: state.host.clone(),
        },
    );
    respond(server, state, sink, Reply::YourHost);
    respond(server, state, sink, Reply::Created);
    respond(server, state, sink, Reply::MyInfo);
}

async fn handle_quit(server: &Server, state: &mut ConnState, sink: &Sink, params: &[String]) {
    if !gate(server, state, sink) {
        return;
    }
    let reason = match params.first() {
        Some(reason) => reason.clone(),
        None => String::from("Client Quit"),
    };
    // await the removal so the nickname is free again before the
    // client even sees the ERROR line
    if let Err(err) = server.quit(&state.nick, &reason).await {
        unexpected("QUIT", err);
    }
    respond(
        server,
        state,
        sink,
        Reply::ClosingLink {
            host: state.host.clone(),
            reason,
        },
    );
    state.quit = true;
}

async fn handle_privmsg(server: &Server, state: &mut ConnState, sink: &Sink, params: &[String]) {
    if !gate(server, state, sink) {
        return;
    }
    if params.is_empty() {
        respond(server, state, sink, Reply::NoRecipient);
        return;
    }
    if params.len() == 1 {
        respond(server, state, sink, Reply::NoTextToSend);
        return;
    }

    let target = &params[0];
    let line = format!(
        ":{}!{}@{} PRIVMSG {} :{}\r\n",
        state.nick, state.user, state.host, target, params[1]
    );
    match server.privmsg(target, line).await {
        Ok(()) => respond(server, state, sink, Reply::Empty),
        Err(Error::NoSuchNick(_)) => {
            respond(
                server,
                state,
                sink,
                Reply::NoSuchNick {
                    target: target.clone(),
                },
            );
        }
        Err(err) => unexpected("PRIVMSG", err),
    }
}

// same construction as PRIVMSG, but a notice never answers the sender:
// no error numerics, no placeholder on success
async fn handle_notice(server: &Server, state: &mut ConnState, sink: &Sink, params: &[String]) {
    if !gate(server, state, sink) {
        return;
    }
    if params.len() < 2 {
        return;
    }

    let target = &params[0];
    let line = format!(
        ":{}!{}@{} NOTICE {} :{}\r\n",
        state.nick, state.user, state.host, target, params[1]
    );
    let _ = server.privmsg(target, line).await;
}

fn handle_ping(server: &Server, state: &ConnState, sink: &Sink, params: &[String]) {
    if !gate(server, state, sink) {
        return;
    }
    match params.first() {
        Some(token) => respond(
            server,
            state,
            sink,
            Reply::Pong {
                token: token.clone(),
            },
        ),
        None => respond(
            server,
            state,
            sink,
            Reply::NeedMoreParams {
                command: String::from("PING"),
            },
        ),
    }
}

fn handle_pong(server: &Server, state: &ConnState, sink: &Sink) {
    // nothing to do; we never time peers out
    let _ = gate(server, state, sink);
}

fn handle_motd(server: &Server, state: &ConnState, sink: &Sink) {
    if !gate(server, state, sink) {
        return;
    }
    respond(server, state, sink, Reply::NoMotd);
}

async fn handle_lusers(server: &Server, state: &ConnState, sink: &Sink) {
    if !gate(server, state, sink) {
        return;
    }
    let connections = match server.connection_count().await {
        Ok(count) => count,
        Err(err) => return unexpected("LUSERS", err),
    };
    let users = match server.user_count().await {
        Ok(count) => count,
        Err(err) => return unexpected("LUSERS", err),
    };
    respond(server, state, sink, Reply::LuserClient { users });
    respond(server, state, sink, Reply::LuserOp);
    respond(
        server,
        state,
        sink,
        Reply::LuserUnknown {
            unknown: connections.saturating_sub(users),
        },
    );
    respond(server, state, sink, Reply::LuserChannels);
    respond(server, state, sink, Reply::LuserMe { clients: connections });
}

async fn handle_whois(server: &Server, state: &ConnState, sink: &Sink, params: &[String]) {
    if !gate(server, state, sink) {
        return;
    }
    let target = match params.first() {
        Some(target) => target.clone(),
        // WHOIS with nothing to ask about says nothing
        None => return,
    };
    match server.host_name(&target).await {
        Ok(host) => {
            let realname = match server.real_name(&target).await {
                Ok(realname) => realname,
                Err(err) => return unexpected("WHOIS", err),
            };
            respond(
                server,
                state,
                sink,
                Reply::WhoisUser {
                    target: target.clone(),
                    host,
                    realname,
                },
            );
            respond(
                server,
                state,
                sink,
                Reply::WhoisServer {
                    target: target.clone(),
                },
            );
            respond(server, state, sink, Reply::EndOfWhois { target });
        }
        Err(Error::NoSuchNick(_)) => {
            respond(server, state, sink, Reply::NoSuchNick { target });
        }
        Err(err) => unexpected("WHOIS", err),
    }
}

async fn handle_join(server: &Server, state: &mut ConnState, sink: &Sink, params: &[String]) {
    if !gate(server, state, sink) {
        return;
    }
    let chan = match params.first() {
        Some(chan) => chan.clone(),
        None => {
            respond(
                server,
                state,
                sink,
                Reply::NeedMoreParams {
                    command: String::from("JOIN"),
                },
            );
            return;
        }
    };
    match server.join(&state.nick, &chan).await {
        Ok(members) => {
            // our own JOIN echo is already in the mailbox, pushed by
            // the coordinator during the broadcast
            respond(server, state, sink, Reply::Topic { chan: chan.clone() });
            respond(
                server,
                state,
                sink,
                Reply::NamReply {
                    chan: chan.clone(),
                    members,
                },
            );
            respond(server, state, sink, Reply::EndOfNames { chan });
        }
        Err(err) => unexpected("JOIN", err),
    }
}

async fn handle_part(server: &Server, state: &mut ConnState, sink: &Sink, params: &[String]) {
    if !gate(server, state, sink) {
        return;
    }
    let chan = match params.first() {
        Some(chan) => chan.clone(),
        None => {
            respond(
                server,
                state,
                sink,
                Reply::NeedMoreParams {
                    command: String::from("PART"),
                },
            );
            return;
        }
    };
    let reason = params.get(1).map(String::as_str);
    match server.part(&state.nick, &chan, reason).await {
        // our PART echo arrives through the mailbox with the broadcast
        Ok(()) => {}
        Err(Error::NoSuchChannel(_)) => {
            respond(server, state, sink, Reply::NoSuchChannel { chan });
        }
        Err(Error::NotOnChannel(_)) => {
            respond(server, state, sink, Reply::NotOnChannel { chan });
        }
        Err(err) => unexpected("PART", err),
    }
}

fn handle_placeholder(server: &Server, state: &ConnState, sink: &Sink) {
    if !gate(server, state, sink) {
        return;
    }
    respond(server, state, sink, Reply::Empty);
}
