// toy-ircd - a toy IRC server
// library surface: the coordinator (irc), the per-connection driver
// (client) and the stream wrappers (io). the binaries and the
// integration tests are all thin layers over these three.
pub mod client;
pub mod io;
pub mod irc;
