//! Service moniker parsing
//!
//! A service moniker names a service endpoint as a display string:
//!
//! ```text
//! service:address=net.tcp://host/svc, binding=netTcpBinding, contract={...}
//! ```
//!
//! - The `service:` or `service4:` prefix is optional
//! - Pairs are `keyword=value`, separated by commas
//! - Values may be double-quoted so they can contain commas or edge spaces
//! - A trailing comma is an error
//! - Keywords are case-insensitive and drawn from a fixed set
//!
//! Every failure is a [`MonikerSyntaxError`] carrying `MK_E_SYNTAX` and the
//! byte position where parsing stopped.

use std::fmt;
use std::str::FromStr;

use crate::types::{Guid, InterfaceId, MonikerSyntaxError};

const PREFIXES: [&str; 2] = ["service:", "service4:"];

/// Recognized moniker keywords
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MonikerKeyword {
    Address,
    Binding,
    BindingConfiguration,
    BindingNamespace,
    Contract,
    ContractNamespace,
    Wsdl,
    SpnIdentity,
    UpnIdentity,
    DnsIdentity,
    Serializer,
    MexAddress,
    MexBinding,
    MexBindingConfiguration,
    MexBindingNamespace,
    MexContract,
    MexContractNamespace,
}

impl MonikerKeyword {
    pub const ALL: [MonikerKeyword; 17] = [
        Self::Address,
        Self::Binding,
        Self::BindingConfiguration,
        Self::BindingNamespace,
        Self::Contract,
        Self::ContractNamespace,
        Self::Wsdl,
        Self::SpnIdentity,
        Self::UpnIdentity,
        Self::DnsIdentity,
        Self::Serializer,
        Self::MexAddress,
        Self::MexBinding,
        Self::MexBindingConfiguration,
        Self::MexBindingNamespace,
        Self::MexContract,
        Self::MexContractNamespace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Binding => "binding",
            Self::BindingConfiguration => "bindingConfiguration",
            Self::BindingNamespace => "bindingNamespace",
            Self::Contract => "contract",
            Self::ContractNamespace => "contractNamespace",
            Self::Wsdl => "wsdl",
            Self::SpnIdentity => "spnIdentity",
            Self::UpnIdentity => "upnIdentity",
            Self::DnsIdentity => "dnsIdentity",
            Self::Serializer => "serializer",
            Self::MexAddress => "mexAddress",
            Self::MexBinding => "mexBinding",
            Self::MexBindingConfiguration => "mexBindingConfiguration",
            Self::MexBindingNamespace => "mexBindingNamespace",
            Self::MexContract => "mexContract",
            Self::MexContractNamespace => "mexContractNamespace",
        }
    }

    /// Case-insensitive keyword lookup
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for MonikerKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed service moniker
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceMoniker {
    pairs: Vec<(MonikerKeyword, String)>,
}

impl ServiceMoniker {
    /// Parse a moniker display name
    pub fn parse(display_name: &str) -> Result<Self, MonikerSyntaxError> {
        Parser::new(display_name).parse()
    }

    /// Value for `keyword`, if present
    pub fn get(&self, keyword: MonikerKeyword) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, v)| v.as_str())
    }

    /// Endpoint address
    pub fn address(&self) -> Option<&str> {
        self.get(MonikerKeyword::Address)
    }

    /// The `contract` value read as an interface id, when it is a GUID
    pub fn contract_id(&self) -> Option<InterfaceId> {
        self.get(MonikerKeyword::Contract)
            .and_then(Guid::parse)
            .map(InterfaceId)
    }

    /// Pairs in the order they appeared
    pub fn iter(&self) -> impl Iterator<Item = (MonikerKeyword, &str)> {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromStr for ServiceMoniker {
    type Err = MonikerSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServiceMoniker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("service:")?;
        for (i, (keyword, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if value.contains(',') || value.trim() != value {
                write!(f, "{keyword}=\"{value}\"")?;
            } else {
                write!(f, "{keyword}={value}")?;
            }
        }
        Ok(())
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error(&self, position: usize, message: impl Into<String>) -> MonikerSyntaxError {
        MonikerSyntaxError::new(position, message)
    }

    fn parse(mut self) -> Result<ServiceMoniker, MonikerSyntaxError> {
        self.skip_whitespace();
        for prefix in PREFIXES {
            let head = self.rest().get(..prefix.len());
            if head.map_or(false, |h| h.eq_ignore_ascii_case(prefix)) {
                self.pos += prefix.len();
                break;
            }
        }

        let mut moniker = ServiceMoniker::default();
        loop {
            self.skip_whitespace();
            if self.rest().is_empty() {
                break;
            }

            let (keyword, value) = self.pair()?;
            if moniker.get(keyword).is_some() {
                return Err(self.error(self.pos, format!("duplicate keyword '{keyword}'")));
            }
            moniker.pairs.push((keyword, value));

            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.rest().is_empty() {
                        return Err(self.error(self.pos, "expected keyword after ','"));
                    }
                }
                Some(_) => return Err(self.error(self.pos, "expected ',' between pairs")),
            }
        }
        Ok(moniker)
    }

    fn pair(&mut self) -> Result<(MonikerKeyword, String), MonikerSyntaxError> {
        let start = self.pos;
        let rest = self.rest();
        let end = rest.find(|c: char| c == '=' || c == ',').unwrap_or(rest.len());
        let name = rest[..end].trim();
        if !rest[end..].starts_with('=') {
            return Err(self.error(start + end, format!("missing '=' after '{name}'")));
        }
        if name.is_empty() {
            return Err(self.error(start, "empty keyword"));
        }
        let keyword = MonikerKeyword::lookup(name)
            .ok_or_else(|| self.error(start, format!("unknown keyword '{name}'")))?;
        self.pos += end + 1;

        self.skip_whitespace();
        let value = if self.peek() == Some('"') {
            self.quoted()?
        } else {
            let rest = self.rest();
            let end = rest.find(',').unwrap_or(rest.len());
            self.pos += end;
            rest[..end].trim().to_string()
        };
        Ok((keyword, value))
    }

    fn quoted(&mut self) -> Result<String, MonikerSyntaxError> {
        let open = self.pos;
        self.pos += 1;
        let rest = self.rest();
        let close = rest
            .find('"')
            .ok_or_else(|| self.error(open, "unterminated quoted value"))?;
        let value = rest[..close].to_string();
        self.pos += close + 1;

        self.skip_whitespace();
        match self.peek() {
            None | Some(',') => Ok(value),
            Some(_) => Err(self.error(self.pos, "unexpected text after quoted value")),
        }
    }
}
