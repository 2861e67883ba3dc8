// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Linux network interface names.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A string which has been checked to be a legal linux network interface name.
///
/// Legal names are 1 to 15 bytes of alphanumeric ASCII, `.`, `-` and `_` (the kernel reserves a
/// 16th byte for the terminating null).
#[repr(transparent)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct InterfaceName(String);

/// Errors which may occur when mapping a `String` into an [`InterfaceName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalInterfaceName {
    #[error("interface name must be at least one character")]
    Empty,
    #[error("name must not be . or ..")]
    OnlyDots(String),
    #[error("interface name {0} is too long")]
    TooLong(String),
    #[error(
        "interface name {0} contains illegal characters (only alphanumeric ASCII and .-_ are permitted)"
    )]
    IllegalCharacters(String),
}

impl InterfaceName {
    /// The maximum length of a linux network interface name (excluding the trailing null).
    pub const MAX_LEN: usize = 15;
}

impl Display for InterfaceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for InterfaceName {
    type Error = IllegalInterfaceName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        const LEGAL_PUNCT: [char; 3] = ['.', '-', '_'];
        if value.is_empty() {
            return Err(IllegalInterfaceName::Empty);
        }
        if value == "." || value == ".." {
            return Err(IllegalInterfaceName::OnlyDots(value));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || LEGAL_PUNCT.contains(&c))
        {
            return Err(IllegalInterfaceName::IllegalCharacters(value));
        }
        if value.len() > InterfaceName::MAX_LEN {
            return Err(IllegalInterfaceName::TooLong(value));
        }
        Ok(InterfaceName(value))
    }
}

impl TryFrom<&str> for InterfaceName {
    type Error = IllegalInterfaceName;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl std::str::FromStr for InterfaceName {
    type Err = IllegalInterfaceName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl From<InterfaceName> for String {
    fn from(value: InterfaceName) -> Self {
        value.0
    }
}

impl AsRef<str> for InterfaceName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
