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
use dns_lookup::lookup_addr;
use log::info;
use std::env;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use toy_ircd::client;
use toy_ircd::irc::Server;

#[tokio::main]
async fn main() {
    env_logger::init();

    let arguments: Vec<String> = env::args().collect();
    if arguments.len() < 2 {
        println!("Please provide port number");
        return;
    }

    let address = format!("0.0.0.0:{}", arguments[1]);
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            println!("{}", err);
            return;
        }
    };

    let name = dns_lookup::get_hostname().unwrap_or_else(|_| String::from("localhost"));
    let server = Server::spawn(&name);
    info!("{} listening on {}", name, address);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                println!("{}", err);
                return;
            }
        };
        let host = host_label(peer).await;
        info!("connection from {}", host);
        client::spawn(server.clone(), socket, host);
    }
}

// reverse-resolve the peer into something printable for prefixes and
// WHOIS; fall back to the bare address when the lookup fails
async fn host_label(peer: SocketAddr) -> String {
    tokio::task::spawn_blocking(move || {
        lookup_addr(&peer.ip()).unwrap_or_else(|_| peer.to_string())
    })
    .await
    .unwrap_or_else(|_| peer.to_string())
}
