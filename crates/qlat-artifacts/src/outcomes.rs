use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use qlat_reconcile::OutcomeSink;
use qlat_schemas::Outcome;

/// Buffered JSONL writer for per-record outcomes. Truncates on create.
pub struct JsonlOutcomeWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: u64,
}

impl JsonlOutcomeWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir failed: {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("create outcome file failed: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl OutcomeSink for JsonlOutcomeWriter {
    fn record(&mut self, outcome: &Outcome) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, outcome).map_err(io::Error::other)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
