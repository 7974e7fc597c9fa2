//! The DNS override record model shared by the master store and the sync agent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of record types the store knows about.
///
/// Only a subset accepts writes; the rest exist so stored data from older
/// deployments still round-trips. See [`RecordType::is_writable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Ptr,
    Cert,
    Srv,
    Txt,
    Soa,
}

impl RecordType {
    /// The canonical uppercase token for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Ns => "NS",
            Self::Ptr => "PTR",
            Self::Cert => "CERT",
            Self::Srv => "SRV",
            Self::Txt => "TXT",
            Self::Soa => "SOA",
        }
    }

    /// Whether the store accepts writes for this type.
    pub fn is_writable(self) -> bool {
        matches!(self, Self::A | Self::Aaaa | Self::Cname | Self::Mx)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known record type tokens.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown DNS record type \"{0}\"")]
pub struct UnknownRecordType(pub String);

impl FromStr for RecordType {
    type Err = UnknownRecordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "NS" => Ok(Self::Ns),
            "PTR" => Ok(Self::Ptr),
            "CERT" => Ok(Self::Cert),
            "SRV" => Ok(Self::Srv),
            "TXT" => Ok(Self::Txt),
            "SOA" => Ok(Self::Soa),
            _ => Err(UnknownRecordType(s.to_string())),
        }
    }
}

/// A single DNS override record.
///
/// Identity is the tuple (zone, resource, rtype, rdata); the numeric id is a
/// storage detail and never leaves the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Storage row id. Not part of the wire contract.
    #[serde(skip)]
    pub id: i64,
    /// The registrable zone this record belongs to (e.g. "example.com").
    pub zone: String,
    /// Label within the zone; empty for an apex record.
    pub resource: String,
    pub rtype: RecordType,
    pub rdata: String,
    /// Time to live in seconds; always positive.
    pub ttl: i64,
    /// Unix timestamp, set once at insert.
    pub created: i64,
    /// Unix timestamp, touched on every mutation.
    pub updated: i64,
}

impl Record {
    /// The fully-qualified name: `resource.zone`, or the bare zone for an
    /// apex record.
    pub fn fqdn(&self) -> String {
        if self.resource.is_empty() {
            self.zone.clone()
        } else {
            format!("{}.{}", self.resource, self.zone)
        }
    }
}

/// Write payload for inserting a record.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub zone: String,
    pub resource: String,
    pub rtype: RecordType,
    pub rdata: String,
    pub ttl: i64,
}

/// Partial update for the upsert-by-key operation. `zone` and `rdata` become
/// mandatory when the key matches nothing and a fresh insert happens instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPatch {
    pub zone: Option<String>,
    pub rdata: Option<String>,
    pub ttl: Option<i64>,
}

/// Recover the resource label from a fully-qualified name and its zone.
///
/// Returns `Some("")` for the apex (`rname == zone`) and `None` when `zone`
/// is not a label-aligned suffix of `rname`.
pub fn resource_within(zone: &str, rname: &str) -> Option<String> {
    if rname == zone {
        return Some(String::new());
    }
    rname
        .strip_suffix(zone)
        .and_then(|head| head.strip_suffix('.'))
        .map(str::to_string)
}
