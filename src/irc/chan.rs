use std::collections::BTreeMap;

/// Channel-local status for one member. Everyone gets voice here; there
/// are no operators.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub prefix: char,
}

impl Default for Member {
    fn default() -> Member {
        Member { prefix: '+' }
    }
}

/// One named channel. The member map is keyed by nickname; a BTreeMap
/// keeps iteration in ascending nickname order, which is exactly the
/// order RPL_NAMREPLY wants, so the member list never needs sorting.
///
/// Membership only ever changes on the coordinator task, so there is no
/// locking in here.
#[derive(Debug, Default)]
pub struct Channel {
    members: BTreeMap<String, Member>,
}

// channel names start with one of these
pub fn is_channel_name(target: &str) -> bool {
    matches!(target.chars().next(), Some('&' | '#' | '+' | '!'))
}

impl Channel {
    pub fn new() -> Channel {
        Channel::default()
    }

    // joining twice is fine, the existing membership stays
    pub fn join(&mut self, nick: &str) {
        self.members.entry(nick.to_string()).or_default();
    }

    pub fn remove(&mut self, nick: &str) -> bool {
        self.members.remove(nick).is_some()
    }

    /* carry a membership over to a new nickname, keeping its status
     * prefix; used when a registered user changes nick */
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(member) = self.members.remove(old) {
            self.members.insert(new.to_string(), member);
        }
    }

    pub fn contains(&self, nick: &str) -> bool {
        self.members.contains_key(nick)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn nicks(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// The RPL_NAMREPLY payload: `<prefix><nick>` tokens separated by
    /// single spaces, ascending by nickname, no trailing space.
    pub fn member_list(&self) -> String {
        self.members
            .iter()
            .map(|(nick, member)| format!("{}{}", member.prefix, nick))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_list_is_sorted_without_trailing_space() {
        let mut chan = Channel::new();
        chan.join("guest");
        chan.join("creator");
        chan.join("ada");
        assert_eq!(chan.member_list(), "+ada +creator +guest");
    }

    #[test]
    fn test_rejoin_is_idempotent() {
        let mut chan = Channel::new();
        chan.join("creator");
        chan.join("creator");
        assert_eq!(chan.member_list(), "+creator");
    }

    #[test]
    fn test_remove_reports_membership() {
        let mut chan = Channel::new();
        chan.join("creator");
        assert!(chan.remove("creator"));
        assert!(!chan.remove("creator"));
        assert!(chan.is_empty());
    }

    #[test]
    fn test_rename_keeps_prefix() {
        let mut chan = Channel::new();
        chan.join("guest");
        chan.rename("guest", "notguest");
        assert!(!chan.contains("guest"));
        assert_eq!(chan.member_list(), "+notguest");
    }

    #[test]
    fn test_channel_name_prefixes() {
        assert!(is_channel_name("#test"));
        assert!(is_channel_name("&local"));
        assert!(is_channel_name("+mode"));
        assert!(is_channel_name("!id"));
        assert!(!is_channel_name("nickname"));
        assert!(!is_channel_name(""));
    }
}
