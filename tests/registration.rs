// end-to-end coverage of the handshake and the registration gate,
// driven over in-process pipes
mod common;

use common::Session;

#[tokio::test]
async fn test_unknown_command_responds_with_error() {
    let server = common::server();
    let mut client = Session::connect(&server);

    client.send("FOO this fails\r\n").await;
    assert_eq!(
        client.read_line().await,
        ":bar.example.com 421 * FOO :Unknown command\r\n"
    );
}

#[tokio::test]
async fn test_empty_line_is_an_unknown_command() {
    let server = common::server();
    let mut client = Session::connect(&server);

    client.send("\r\n").await;
    assert_eq!(
        client.read_line().await,
        ":bar.example.com 421 *  :Unknown command\r\n"
    );
}

#[tokio::test]
async fn test_register_responds_with_welcome_burst() {
    let tests = [
        ("NICK then USER", "NICK nick\r\n", "USER user 0 * :Joe Bloggs\r\n"),
        ("USER then NICK", "USER user 0 * :Joe Bloggs\r\n", "NICK nick\r\n"),
    ];

    let expected = [
        ":bar.example.com 001 nick :Welcome to the Internet Relay Network nick!user@pipe\r\n",
        ":bar.example.com 002 nick :Your host is bar.example.com, running version 0.0\r\n",
        ":bar.example.com 003 nick :This server was created 01/01/1970\r\n",
        ":bar.example.com 004 nick :bar.example.com 0.0 0 0\r\n",
    ];

    for (name, first, second) in tests {
        let server = common::server();
        let mut client = Session::connect(&server);

        client.send(first).await;
        assert_eq!(client.read_line().await, "\r\n", "{}: placeholder", name);

        client.send(second).await;
        for line in expected {
            assert_eq!(client.read_line().await, line, "{}", name);
        }
    }
}

#[tokio::test]
async fn test_nick_without_parameter() {
    let server = common::server();
    let mut client = Session::connect(&server);

    client.send("NICK\r\n").await;
    assert_eq!(
        client.read_line().await,
        ":bar.example.com 431 * :No nickname given\r\n"
    );
}

#[tokio::test]
async fn test_nick_already_in_use() {
    let server = common::server();
    let _guest = Session::register(&server, "guest").await;

    // claiming a held nickname fails whether USER has arrived or not
    let mut latecomer = Session::connect(&server);
    latecomer.send("NICK guest\r\n").await;
    assert_eq!(
        latecomer.read_line().await,
        ":bar.example.com 433 * guest :Nickname is already in use\r\n"
    );

    // the rejected nickname is not kept: the connection is still
    // unregistered and a different nickname completes the handshake
    latecomer.send("MOTD\r\n").await;
    assert_eq!(
        latecomer.read_line().await,
        ":bar.example.com 451 * :You have not registered\r\n"
    );
    latecomer.send("USER other 0 * :Joe Bloggs\r\n").await;
    assert_eq!(latecomer.read_line().await, "\r\n");
    latecomer.send("NICK other\r\n").await;
    assert_eq!(
        latecomer.read_line().await,
        ":bar.example.com 001 other :Welcome to the Internet Relay Network other!other@pipe\r\n"
    );
}

#[tokio::test]
async fn test_nick_conflict_after_user() {
    let server = common::server();
    let _guest = Session::register(&server, "guest").await;

    let mut latecomer = Session::connect(&server);
    latecomer.send("USER guest 0 * :Joe Bloggs\r\n").await;
    assert_eq!(latecomer.read_line().await, "\r\n");
    latecomer.send("NICK guest\r\n").await;
    assert_eq!(
        latecomer.read_line().await,
        ":bar.example.com 433 * guest :Nickname is already in use\r\n"
    );
}

#[tokio::test]
async fn test_user_errors() {
    let server = common::server();

    // too few parameters, before any registration
    let mut fresh = Session::connect(&server);
    fresh.send("USER guest 0 *\r\n").await;
    assert_eq!(
        fresh.read_line().await,
        ":bar.example.com 461 * USER :Not enough parameters\r\n"
    );

    // and the same after registering, plus the reregistration error
    let mut guest = Session::register(&server, "guest").await;
    guest.send("USER guest 0 *\r\n").await;
    assert_eq!(
        guest.read_line().await,
        ":bar.example.com 461 guest USER :Not enough parameters\r\n"
    );
    guest.send("USER guest 0 * :Joe Bloggs\r\n").await;
    assert_eq!(
        guest.read_line().await,
        ":bar.example.com 462 guest :Unauthorized command (already registered)\r\n"
    );
}

#[tokio::test]
async fn test_commands_rejected_if_not_registered() {
    let commands = [
        "QUIT\r\n",
        "PRIVMSG\r\n",
        "NOTICE\r\n",
        "PING\r\n",
        "PONG\r\n",
        "MOTD\r\n",
        "LUSERS\r\n",
        "WHOIS\r\n",
        "JOIN\r\n",
        "PART\r\n",
        "TOPIC\r\n",
        "AWAY\r\n",
        "NAMES\r\n",
        "LIST\r\n",
        "WHO\r\n",
    ];

    for command in commands {
        let server = common::server();
        let mut client = Session::connect(&server);
        client.send("NICK guest\r\n").await;
        assert_eq!(client.read_line().await, "\r\n");

        client.send(command).await;
        assert_eq!(
            client.read_line().await,
            ":bar.example.com 451 * :You have not registered\r\n",
            "{}",
            command.trim_end()
        );
    }
}

#[tokio::test]
async fn test_nick_change_round_trip() {
    let server = common::server();
    let mut guest = Session::register(&server, "guest").await;

    guest.send("NICK notguest\r\n").await;
    assert_eq!(guest.read_line().await, ":guest NICK notguest\r\n");

    // the old name is gone
    guest.send("WHOIS guest\r\n").await;
    assert_eq!(
        guest.read_line().await,
        ":bar.example.com 401 notguest guest :No such nick/channel\r\n"
    );

    // and the new one answers with the identity carried over
    guest.send("WHOIS notguest\r\n").await;
    assert_eq!(
        guest.read_line().await,
        ":bar.example.com 311 notguest notguest notguest pipe :Joe Bloggs\r\n"
    );
    assert_eq!(
        guest.read_line().await,
        ":bar.example.com 312 notguest notguest bar.example.com :Toy server\r\n"
    );
    assert_eq!(
        guest.read_line().await,
        ":bar.example.com 318 notguest notguest :End of /WHOIS list\r\n"
    );
}

#[tokio::test]
async fn test_nick_change_to_held_name_keeps_current_nick() {
    let server = common::server();
    let _guest = Session::register(&server, "guest").await;
    let mut other = Session::register(&server, "other").await;

    other.send("NICK guest\r\n").await;
    assert_eq!(
        other.read_line().await,
        ":bar.example.com 433 other guest :Nickname is already in use\r\n"
    );

    // still reachable under the old name
    other.send("WHOIS other\r\n").await;
    assert_eq!(
        other.read_line().await,
        ":bar.example.com 311 other other other pipe :Joe Bloggs\r\n"
    );
    other.read_line().await;
    other.read_line().await;
}

#[tokio::test]
async fn test_whois_without_parameter_is_silent() {
    let server = common::server();
    let mut guest = Session::register(&server, "guest").await;

    guest.send("WHOIS\r\n").await;
    // nothing comes back for it; the next command answers immediately
    guest.send("PING token\r\n").await;
    assert_eq!(
        guest.read_line().await,
        ":bar.example.com PONG bar.example.com token\r\n"
    );
}
