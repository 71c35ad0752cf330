use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use qlat_reconcile::SourceRecord;
use qlat_schemas::StatsFile;
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};

pub fn write_stats_json(path: &Path, stats: &StatsFile) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("serialize stats failed")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write stats failed: {}", path.display()))?;
    Ok(())
}

/// JSON array of the records' original lines, embedded byte-for-byte.
pub fn write_lost_json(path: &Path, lost: &[&SourceRecord]) -> Result<()> {
    let mut items: Vec<Box<RawValue>> = Vec::with_capacity(lost.len());
    for rec in lost {
        let text = std::str::from_utf8(&rec.raw)
            .with_context(|| format!("lost record '{}' is not utf-8", rec.id))?;
        let raw = RawValue::from_string(text.to_string())
            .with_context(|| format!("lost record '{}' is not valid JSON", rec.id))?;
        items.push(raw);
    }
    let json = serde_json::to_string_pretty(&items).context("serialize lost manifest failed")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write lost manifest failed: {}", path.display()))?;
    Ok(())
}

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("open for hashing failed: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("hash read failed: {}", path.display()))
            }
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, raw: &str) -> SourceRecord {
        SourceRecord {
            id: id.to_string(),
            sent_time_us: 0,
            raw: raw.as_bytes().to_vec(),
        }
    }

    #[test]
    fn lost_manifest_keeps_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lost.json");
        let c = rec("c", r#"{"z":1,"message_id":"c",  "sent_epoch":3}"#);

        write_lost_json(&path, &[&c]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#"{"z":1,"message_id":"c",  "sent_epoch":3}"#));

        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 1);
        assert_eq!(v[0]["message_id"], "c");
    }

    #[test]
    fn empty_lost_manifest_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lost.json");
        write_lost_json(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn sha256_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
