//! Cache user access strings.
//!
//! An access string is a space-separated list of rules applied left to right:
//!
//! | Token            | Meaning                              |
//! |------------------|--------------------------------------|
//! | `on` / `off`     | enable or disable the user           |
//! | `~<pattern>`     | allow keys matching the glob pattern |
//! | `%R~` / `%W~` / `%RW~<pattern>` | read-only, write-only or read-write keys |
//! | `&<pattern>`     | allow pub/sub channels               |
//! | `+<command>`     | allow a command (`+client\|setname`, `+json.get`) |
//! | `-<command>`     | deny a command                       |
//! | `+@<category>`   | allow a command category             |
//! | `-@<category>`   | deny a command category              |
//! | `allkeys`, `allcommands`, `nocommands`, `allchannels` | shorthands |
//! | `resetkeys`, `resetchannels` | drop the patterns granted so far |
//!
//! Password rules (`>pw`, `<pw`, `#hash`, `nopass`) are rejected: the
//! password is always bound through the credential reference.

use rbac_core::{RbacError, RbacResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access string applied when none is supplied: disabled, read-only on `keys*`.
pub const DEFAULT_ACCESS_STRING: &str = "off +get ~keys*";

/// Access string that grants nothing.
pub const DENY_ALL_ACCESS_STRING: &str = "off -@all";

/// A single parsed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessToken {
    /// `on`
    On,
    /// `off`
    Off,
    /// `~<pattern>`
    KeyPattern(String),
    /// `%R~<pattern>`
    ReadKeyPattern(String),
    /// `%W~<pattern>`
    WriteKeyPattern(String),
    /// `&<pattern>`
    ChannelPattern(String),
    /// `+<command>`
    AllowCommand(String),
    /// `-<command>`
    DenyCommand(String),
    /// `+@<category>`
    AllowCategory(String),
    /// `-@<category>`
    DenyCategory(String),
    /// `allkeys`
    AllKeys,
    /// `allcommands`
    AllCommands,
    /// `nocommands`
    NoCommands,
    /// `allchannels`
    AllChannels,
    /// `resetkeys`
    ResetKeys,
    /// `resetchannels`
    ResetChannels,
}

impl AccessToken {
    fn parse(token: &str) -> Result<Self, String> {
        match token {
            "on" => return Ok(Self::On),
            "off" => return Ok(Self::Off),
            "allkeys" => return Ok(Self::AllKeys),
            "allcommands" => return Ok(Self::AllCommands),
            "nocommands" => return Ok(Self::NoCommands),
            "allchannels" => return Ok(Self::AllChannels),
            "resetkeys" => return Ok(Self::ResetKeys),
            "resetchannels" => return Ok(Self::ResetChannels),
            "nopass" | "resetpass" => {
                return Err(format!("'{}' is not allowed; passwords come from the credential", token));
            }
            _ => {}
        }

        let mut chars = token.chars();
        let Some(sigil) = chars.next() else {
            return Err("empty rule".to_string());
        };
        let rest = chars.as_str();

        match sigil {
            '~' => pattern(rest, token).map(Self::KeyPattern),
            '%' => selector(rest, token),
            '&' => pattern(rest, token).map(Self::ChannelPattern),
            '+' | '-' => {
                let allow = sigil == '+';
                if let Some(category) = rest.strip_prefix('@') {
                    let category = name(category, token, false)?;
                    Ok(if allow { Self::AllowCategory(category) } else { Self::DenyCategory(category) })
                } else {
                    let command = name(rest, token, true)?;
                    Ok(if allow { Self::AllowCommand(command) } else { Self::DenyCommand(command) })
                }
            }
            '>' | '<' | '#' | '!' => Err(format!(
                "'{}' sets a password inline; passwords come from the credential",
                token
            )),
            _ => Err(format!("unknown rule '{}'", token)),
        }
    }
}

fn pattern(rest: &str, token: &str) -> Result<String, String> {
    if rest.is_empty() {
        return Err(format!("'{}' has an empty pattern", token));
    }
    Ok(rest.to_string())
}

fn selector(rest: &str, token: &str) -> Result<AccessToken, String> {
    let Some((permission, glob)) = rest.split_once('~') else {
        return Err(format!("'{}' is missing '~' after the key permission", token));
    };
    let glob = pattern(glob, token)?;
    match permission {
        "R" => Ok(AccessToken::ReadKeyPattern(glob)),
        "W" => Ok(AccessToken::WriteKeyPattern(glob)),
        "RW" | "WR" => Ok(AccessToken::KeyPattern(glob)),
        _ => Err(format!("'{}' has an unknown key permission '{}'", token, permission)),
    }
}

fn name(rest: &str, token: &str, is_command: bool) -> Result<String, String> {
    if rest.is_empty() {
        return Err(format!("'{}' names no command or category", token));
    }
    let valid = rest
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || (is_command && (c == '|' || c == '.')));
    if !valid {
        return Err(format!("'{}' contains invalid characters", token));
    }
    Ok(rest.to_string())
}

/// A validated access string. The supplied text is kept bit-exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessString {
    raw: String,
    tokens: Vec<AccessToken>,
}

impl AccessString {
    /// Parses and validates an access string.
    pub fn parse(raw: impl Into<String>) -> RbacResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(RbacError::invalid_access_string(raw, "access string is empty"));
        }

        let tokens = raw
            .split_whitespace()
            .map(AccessToken::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| RbacError::invalid_access_string(raw.clone(), reason))?;

        Ok(Self { raw, tokens })
    }

    /// The deny-all access string.
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            raw: DENY_ALL_ACCESS_STRING.to_string(),
            tokens: vec![AccessToken::Off, AccessToken::DenyCategory("all".to_string())],
        }
    }

    /// Returns the access string exactly as supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed rules in order.
    #[must_use]
    pub fn tokens(&self) -> &[AccessToken] {
        &self.tokens
    }

    /// Whether the user ends up enabled. Users start disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.tokens.iter().fold(false, |enabled, token| match token {
            AccessToken::On => true,
            AccessToken::Off => false,
            _ => enabled,
        })
    }

    /// Whether the user ends up enabled with every command on every key.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        let mut all_keys = false;
        let mut all_commands = false;
        for token in &self.tokens {
            match token {
                AccessToken::AllKeys => all_keys = true,
                AccessToken::KeyPattern(p) if p == "*" => all_keys = true,
                AccessToken::ResetKeys => all_keys = false,
                AccessToken::AllCommands => all_commands = true,
                AccessToken::AllowCategory(c) if c == "all" => all_commands = true,
                AccessToken::NoCommands => all_commands = false,
                AccessToken::DenyCategory(_) | AccessToken::DenyCommand(_) => all_commands = false,
                _ => {}
            }
        }
        self.is_enabled() && all_keys && all_commands
    }
}

impl Default for AccessString {
    fn default() -> Self {
        Self {
            raw: DEFAULT_ACCESS_STRING.to_string(),
            tokens: vec![
                AccessToken::Off,
                AccessToken::AllowCommand("get".to_string()),
                AccessToken::KeyPattern("keys*".to_string()),
            ],
        }
    }
}

impl FromStr for AccessString {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccessString {
    type Error = RbacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AccessString> for String {
    fn from(value: AccessString) -> Self {
        value.raw
    }
}

impl fmt::Display for AccessString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
