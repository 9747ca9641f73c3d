// shared plumbing for the end-to-end suites: every test talks to the
// server over an in-process pipe, exactly one client session per pipe
#![allow(dead_code)]

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::time::timeout;
use toy_ircd::client;
use toy_ircd::irc::Server;

pub const SERVER_NAME: &str = "bar.example.com";

const READ_DEADLINE: Duration = Duration::from_secs(5);

pub fn server() -> Server {
    Server::spawn(SERVER_NAME)
}

pub struct Session {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl Session {
    pub fn connect(server: &Server) -> Session {
        let (reader, writer) = tokio::io::split(client::spawn_pipe(server));
        Session {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Connect and complete the NICK+USER handshake, discarding the
    /// placeholder line and the welcome burst.
    pub async fn register(server: &Server, nick: &str) -> Session {
        let mut session = Session::connect(server);
        session.send(&format!("NICK {}\r\n", nick)).await;
        assert_eq!(session.read_line().await, "\r\n");
        session
            .send(&format!("USER {} 0 * :Joe Bloggs\r\n", nick))
            .await;
        for _ in 0..4 {
            session.read_line().await;
        }
        session
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("write to server");
    }

    pub async fn read_line(&mut self) -> String {
        let mut line = String::new();
        timeout(READ_DEADLINE, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for the server")
            .expect("read from server");
        line
    }

    /// True once the server has shut our connection down.
    pub async fn at_eof(&mut self) -> bool {
        let mut line = String::new();
        let read = timeout(READ_DEADLINE, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for the server to close")
            .expect("read from server");
        read == 0
    }
}
