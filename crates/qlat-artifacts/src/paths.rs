//! Sibling paths derived from the outcome JSONL path.

use std::path::PathBuf;

const DEFAULT_STEM: &str = "latency";

fn derive(out_jsonl: &str, suffix: &str) -> PathBuf {
    let trimmed = out_jsonl.trim();
    if trimmed.is_empty() {
        return PathBuf::from(format!("{DEFAULT_STEM}{suffix}"));
    }
    let stem = trimmed
        .strip_suffix(".jsonl")
        .or_else(|| trimmed.strip_suffix(".json"))
        .unwrap_or(trimmed);
    PathBuf::from(format!("{stem}{suffix}"))
}

/// `latency.jsonl` -> `latency.stats.json`.
pub fn stats_path_for(out_jsonl: &str) -> PathBuf {
    derive(out_jsonl, ".stats.json")
}

/// `latency.jsonl` -> `latency.manifest.json`.
pub fn manifest_path_for(out_jsonl: &str) -> PathBuf {
    derive(out_jsonl, ".manifest.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_path_rules() {
        assert_eq!(stats_path_for("latency.jsonl"), PathBuf::from("latency.stats.json"));
        assert_eq!(stats_path_for("out/run1.json"), PathBuf::from("out/run1.stats.json"));
        assert_eq!(stats_path_for("results.txt"), PathBuf::from("results.txt.stats.json"));
        assert_eq!(stats_path_for("  "), PathBuf::from("latency.stats.json"));
    }

    #[test]
    fn manifest_path_follows_same_rule() {
        assert_eq!(manifest_path_for("a/b.jsonl"), PathBuf::from("a/b.manifest.json"));
        assert_eq!(manifest_path_for(""), PathBuf::from("latency.manifest.json"));
    }
}
