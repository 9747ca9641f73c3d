// a trivial interactive client: one line out, one line back.
// handy for poking at the server by hand; the real test coverage
// drives the library over in-process pipes instead.
use std::env;
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;

fn main() {
    let arguments: Vec<String> = env::args().collect();
    if arguments.len() < 2 {
        println!("Please provide host:port");
        return;
    }

    let mut stream = match TcpStream::connect(&arguments[1]) {
        Ok(stream) => stream,
        Err(err) => {
            println!("{}", err);
            return;
        }
    };
    let mut responses = match stream.try_clone() {
        Ok(reader) => BufReader::new(reader),
        Err(err) => {
            println!("{}", err);
            return;
        }
    };

    let stdin = io::stdin();
    loop {
        print!(">> ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        if stream
            .write_all(format!("{}\r\n", input.trim_end()).as_bytes())
            .is_err()
        {
            println!("connection lost");
            return;
        }

        let mut response = String::new();
        match responses.read_line(&mut response) {
            Ok(0) | Err(_) => {
                println!("connection closed by server");
                return;
            }
            Ok(_) => print!("->: {}", response),
        }
    }
}
