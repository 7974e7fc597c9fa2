//! Materialization of unbound local-data zone files.
//!
//! One file per zone, fully derived from the zone's current record set and
//! regenerated wholesale. The on-disk text is an external contract: unbound
//! parses these files directly.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use zonesync_types::{Record, RecordType};

/// Render the override file for one zone.
///
/// Deterministic: records are emitted in (resource, rtype, rdata) order, and
/// every A record is preceded by its reverse-mapping line.
pub fn render(zone: &str, records: &[Record]) -> String {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by(|a, b| {
        (a.resource.as_str(), a.rtype.as_str(), a.rdata.as_str()).cmp(&(
            b.resource.as_str(),
            b.rtype.as_str(),
            b.rdata.as_str(),
        ))
    });

    let mut out = format!("server:\n\nlocal-zone: \"{zone}\" transparent\n\n");
    for record in sorted {
        let fqdn = record.fqdn();
        if record.rtype == RecordType::A {
            out.push_str(&format!(
                "local-data-ptr: \"{} {} {}\"\n",
                record.rdata, record.ttl, fqdn
            ));
        }
        out.push_str(&format!(
            "local-data: \"{} {} {} {}\"\n",
            fqdn, record.ttl, record.rtype, record.rdata
        ));
    }
    out
}

/// Render and atomically replace `<dir>/<zone>.conf`.
///
/// The content is written to a temporary file in the same directory and
/// renamed over the target, so a concurrently-reading unbound process never
/// observes a half-written file.
pub fn write_zone(dir: &Path, zone: &str, records: &[Record]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let target = dir.join(format!("{zone}.conf"));
    let tmp = NamedTempFile::new_in(dir)?;
    fs::write(tmp.path(), render(zone, records))?;
    tmp.persist(&target).map_err(|err| err.error)?;

    debug!(zone, path = %target.display(), "flushed zone file");
    Ok(target)
}

/// Delete `*.conf` files whose zone no longer appears in the authoritative
/// zone set. Must only be called with a complete listing, never a delta.
pub fn remove_stale(dir: &Path, live_zones: &HashSet<String>) -> io::Result<Vec<String>> {
    let mut removed = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // Nothing materialized yet, nothing to clean.
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(removed),
        Err(err) => return Err(err),
    };

    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("conf") {
            continue;
        }
        let Some(zone) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if !live_zones.contains(zone) {
            fs::remove_file(&path)?;
            removed.push(zone.to_string());
        }
    }

    removed.sort();
    Ok(removed)
}
