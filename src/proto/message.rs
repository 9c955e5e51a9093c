//! Owned IRC lines.
//!
//! Only what a bot needs: source prefix, verb, parameters. IRCv3 tags are
//! accepted on input and skipped.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// IRC message prefix - identifies the origin of a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prefix {
    /// Server name (e.g., "irc.example.com")
    ServerName(String),
    /// User prefix: (nickname, username, hostname)
    Nickname(String, String, String),
}

impl Prefix {
    /// Lenient prefix parse. A dot before any `!` or `@` marks a server name.
    pub fn new_from_str(s: &str) -> Self {
        #[derive(Copy, Clone, Eq, PartialEq)]
        enum Part {
            Name,
            User,
            Host,
        }

        let mut name = String::new();
        let mut user = String::new();
        let mut host = String::new();
        let mut part = Part::Name;
        let mut is_server = false;

        for c in s.chars() {
            if c == '.' && part == Part::Name {
                is_server = true;
            }

            match c {
                '!' if part == Part::Name => {
                    is_server = false;
                    part = Part::User;
                }
                '@' if part != Part::Host => {
                    is_server = false;
                    part = Part::Host;
                }
                _ => match part {
                    Part::Name => name.push(c),
                    Part::User => user.push(c),
                    Part::Host => host.push(c),
                },
            }
        }

        if is_server {
            Prefix::ServerName(name)
        } else {
            Prefix::Nickname(name, user, host)
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

/// A single parsed IRC line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrcLine {
    pub prefix: Option<Prefix>,
    /// Command verb or three-digit numeric, as received.
    pub command: String,
    pub params: Vec<String>,
}

impl IrcLine {
    pub fn new(command: &str, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command: command.to_string(),
            params,
        }
    }

    pub fn privmsg(target: &str, text: &str) -> Result<Self, ProtocolError> {
        check_target(target)?;
        Ok(Self::new("PRIVMSG", vec![target.to_string(), sanitize(text)]))
    }

    pub fn notice(target: &str, text: &str) -> Result<Self, ProtocolError> {
        check_target(target)?;
        Ok(Self::new("NOTICE", vec![target.to_string(), sanitize(text)]))
    }

    pub fn change_nick(nick: &str) -> Self {
        Self::new("NICK", vec![nick.to_string()])
    }

    pub fn user(ident: &str, realname: &str) -> Self {
        Self::new(
            "USER",
            vec![
                ident.to_string(),
                "0".to_string(),
                "*".to_string(),
                sanitize(realname),
            ],
        )
    }

    pub fn join(channel: &str) -> Result<Self, ProtocolError> {
        check_target(channel)?;
        Ok(Self::new("JOIN", vec![channel.to_string()]))
    }

    pub fn pong(token: &str) -> Self {
        Self::new("PONG", vec![token.to_string()])
    }

    pub fn quit(message: Option<&str>) -> Self {
        Self::new("QUIT", message.map(sanitize).into_iter().collect())
    }

    /// Nickname of the sender, if the line came from a user.
    pub fn nick(&self) -> Option<&str> {
        match &self.prefix {
            Some(Prefix::Nickname(nick, _, _)) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Final parameter, which carries the text of PRIVMSG/NOTICE.
    pub fn text(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Whether the line was addressed to a channel rather than to us.
    pub fn is_public(&self) -> bool {
        self.param(0).is_some_and(is_channel_name)
    }
}

/// Channel names start with one of the RFC 2811 sigils.
pub fn is_channel_name(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}

/// Whether `target` fits in a single middle parameter.
pub fn is_valid_target(target: &str) -> bool {
    !target.is_empty()
        && !target.starts_with(':')
        && !target.contains(['\r', '\n', '\0', ' '])
}

fn check_target(target: &str) -> Result<(), ProtocolError> {
    if is_valid_target(target) {
        Ok(())
    } else {
        Err(ProtocolError::InvalidTarget(target.to_string()))
    }
}

/// Strip line breaks and NULs so handler-supplied text cannot inject extra commands.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '\r' | '\n' | '\0') { ' ' } else { c })
        .collect()
}

impl FromStr for IrcLine {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, ProtocolError> {
        let mut rest = s.trim_end_matches(['\r', '\n']);
        if rest.trim().is_empty() {
            return Err(ProtocolError::EmptyMessage);
        }

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map_or("", |(_, r)| r).trim_start();
        }

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (raw, remainder) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = remainder.trim_start();
                Some(Prefix::new_from_str(raw))
            }
            None => None,
        };

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(ProtocolError::MissingCommand(s.to_string()));
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, remainder)) => {
                    params.push(param.to_string());
                    rest = remainder;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Ok(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }
}

impl fmt::Display for IrcLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;

        let count = self.params.len();
        for (i, param) in self.params.iter().enumerate() {
            let last = i + 1 == count;
            let needs_colon = last
                && (count > 1 || param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}
