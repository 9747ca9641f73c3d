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

/* the IRC protocol defines a maximum message size of 512 octets,
 * including CR-LF; the reader disconnects clients that exceed it */
pub const MAX_MSG_SIZE: usize = 512;

/* at most 15 parameters per message, the trailing one included */
pub const MAX_MSG_PARAMS: usize = 15;

// this lil function snatches up everything before the trailing
// marker and hands back the trailer in an Option, or just gives
// back the original slice plus a None
fn split_colon_arg(msg: &str) -> (&str, Option<&str>) {
    if let Some(tail) = msg.find(" :") {
        (&msg[..tail], Some(&msg[tail + 2..]))
    } else {
        (msg, None)
    }
}

/// Split one raw line into a command verb and its parameters.
///
/// The line is trimmed of surrounding whitespace (the reader leaves the
/// CR-LF on). Parameters are single-space delimited; everything after
/// the first ` :` marker is one trailing parameter that may contain
/// spaces. An empty line comes back as an empty command with no
/// parameters.
pub fn tokenize(line: &str) -> (String, Vec<String>) {
    let line = line.trim();
    let (middle, trailing) = split_colon_arg(line);

    // the verb plus at most MAX_MSG_PARAMS middle parameters; the
    // behaviour for messages beyond the limit is not part of the
    // protocol surface, extras are simply dropped
    let mut tokens = middle.splitn(MAX_MSG_PARAMS + 1, ' ');
    let command = tokens.next().unwrap_or("").to_string();
    let mut params: Vec<String> = tokens.map(str::to_string).collect();
    if let Some(trail) = trailing {
        params.push(trail.to_string());
    }
    params.truncate(MAX_MSG_PARAMS);

    (command, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_plain_params() {
        let (command, params) = tokenize("FOO this fails\r\n");
        assert!(
            command.eq("FOO"),
            "`FOO` should be the command from `FOO this fails`, instead got {}", command
        );
        assert_eq!(params, vec!["this", "fails"]);
    }

    #[test]
    fn test_tokenize_trailing_param() {
        let (command, params) = tokenize("USER user 0 * :Joe Bloggs\r\n");
        assert_eq!(command, "USER");
        assert_eq!(params, vec!["user", "0", "*", "Joe Bloggs"]);
    }

    #[test]
    fn test_tokenize_trailing_marker_only_applies_once() {
        let (_, params) = tokenize("PRIVMSG receiver :one :two three\r\n");
        assert_eq!(params, vec!["receiver", "one :two three"]);
    }

    #[test]
    fn test_tokenize_no_params() {
        let (command, params) = tokenize("NICK\r\n");
        assert_eq!(command, "NICK");
        assert!(params.is_empty(), "`NICK` has no parameters, got {:?}", params);
    }

    #[test]
    fn test_tokenize_strips_surrounding_whitespace() {
        // a trailing space before CR-LF must not produce a phantom
        // empty parameter
        let (command, params) = tokenize("PRIVMSG \r\n");
        assert_eq!(command, "PRIVMSG");
        assert!(params.is_empty(), "expected no params, got {:?}", params);
    }

    #[test]
    fn test_tokenize_empty_line() {
        let (command, params) = tokenize("\r\n");
        assert_eq!(command, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_tokenize_caps_param_count() {
        let line = format!("VERB {}\r\n", "p ".repeat(30).trim_end());
        let (_, params) = tokenize(&line);
        assert_eq!(params.len(), MAX_MSG_PARAMS);
    }
}
