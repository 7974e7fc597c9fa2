//! Syntactic validation of record writes.
//!
//! Pure functions, no state; safe to call from any number of request
//! handlers concurrently.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;
use zonesync_types::{RecordType, StoreError};

/// One label: alphanumeric, inner hyphens, 1-63 chars.
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$",
    )
    .expect("domain regex is valid")
});

/// Whether `name` is a syntactically valid domain name with at least two
/// labels and a total length within the 253 octet limit.
pub fn is_domain(name: &str) -> bool {
    name.len() <= 253 && DOMAIN_RE.is_match(name)
}

/// Validate a record write.
///
/// Checks, in order: the type is one the store accepts writes for, the
/// fully-qualified name is a valid domain, and the rdata matches the
/// type-specific grammar.
pub fn validate(
    zone: &str,
    resource: &str,
    rtype: RecordType,
    rdata: &str,
) -> Result<(), StoreError> {
    if !rtype.is_writable() {
        return Err(StoreError::UnsupportedType(rtype.to_string()));
    }

    let fqdn =
        if resource.is_empty() { zone.to_string() } else { format!("{resource}.{zone}") };
    if !is_domain(&fqdn) {
        return Err(StoreError::InvalidRecord(format!(
            "invalid {rtype} record name \"{fqdn}\""
        )));
    }

    match rtype {
        RecordType::A => {
            if rdata.parse::<Ipv4Addr>().is_err() {
                return Err(StoreError::InvalidRecord(format!(
                    "rdata \"{rdata}\" is not a valid IPv4 address"
                )));
            }
        }
        RecordType::Aaaa => {
            if rdata.parse::<Ipv6Addr>().is_err() {
                return Err(StoreError::InvalidRecord(format!(
                    "rdata \"{rdata}\" is not a valid IPv6 address"
                )));
            }
        }
        RecordType::Cname => {
            // Tolerate an MX-style "<priority> <domain>" form.
            let target = match rdata.split_once(' ') {
                Some((head, tail)) if head.parse::<i64>().is_ok() => tail,
                _ => rdata,
            };
            if !is_domain(target) {
                return Err(StoreError::InvalidRecord(format!(
                    "invalid {rtype} record rdata \"{rdata}\""
                )));
            }
        }
        RecordType::Mx => {
            let Some((priority, target)) = rdata.split_once(' ') else {
                return Err(StoreError::InvalidRecord(format!(
                    "{rtype} rdata \"{rdata}\" must be \"<priority> <domain>\""
                )));
            };
            match priority.parse::<i64>() {
                Ok(p) if p >= 0 => {}
                _ => {
                    return Err(StoreError::InvalidRecord(format!(
                        "invalid {rtype} record priority \"{priority}\""
                    )))
                }
            }
            if !is_domain(target) {
                return Err(StoreError::InvalidRecord(format!(
                    "invalid {rtype} record rdata \"{rdata}\""
                )));
            }
        }
        // Unreachable while is_writable() covers exactly the four types
        // above; presence-only for any type opened up later.
        _ => {}
    }

    Ok(())
}
