use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{AgentError, AgentResult};

/// 32-byte account identifier.
///
/// Parses `0x`-prefixed or bare hex. Short forms are left-padded, so `0x1`
/// names the same account as `0x000…001`. Always displayed in long form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; AccountAddress::LENGTH]);

impl AccountAddress {
    pub const LENGTH: usize = 32;

    pub const ZERO: Self = Self([0u8; Self::LENGTH]);

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Address whose last byte is `value` and all others zero (`0x1`, `0x3`...).
    pub const fn from_u8(value: u8) -> Self {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[Self::LENGTH - 1] = value;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    pub fn from_hex(input: &str) -> AgentResult<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(AgentError::invalid_address(format!("'{}' has no hex digits", input)));
        }
        if digits.len() > Self::LENGTH * 2 {
            return Err(AgentError::invalid_address(format!(
                "'{}' is longer than {} bytes",
                input,
                Self::LENGTH
            )));
        }

        let padded = format!("{:0>width$}", digits, width = Self::LENGTH * 2);
        let mut bytes = [0u8; Self::LENGTH];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| AgentError::invalid_address(format!("'{}': {}", input, e)))?;

        Ok(Self(bytes))
    }

    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountAddress {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_literal())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex_literal())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_literal())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// An address as callers hand it over: already structured, or still text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressArg {
    Address(AccountAddress),
    Text(String),
}

impl AddressArg {
    pub fn resolve(&self) -> AgentResult<AccountAddress> {
        match self {
            AddressArg::Address(address) => Ok(*address),
            AddressArg::Text(text) => AccountAddress::from_hex(text),
        }
    }
}

impl From<AccountAddress> for AddressArg {
    fn from(address: AccountAddress) -> Self {
        AddressArg::Address(address)
    }
}

impl From<&str> for AddressArg {
    fn from(text: &str) -> Self {
        AddressArg::Text(text.to_string())
    }
}

impl From<String> for AddressArg {
    fn from(text: String) -> Self {
        AddressArg::Text(text)
    }
}
