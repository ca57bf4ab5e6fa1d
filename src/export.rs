//! Writing sweep results to JSON Lines files.

use crate::{Error, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes one JSON object per line.
pub fn write_jsonl<W: Write>(writer: &mut W, records: &[Value]) -> Result<()> {
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|e| Error::internal(format!("serializing record: {e}")))?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Writes `records` to `<dir>/<name>.jsonl` and returns the path.
pub fn export_summaries(dir: impl AsRef<Path>, name: &str, records: &[Value]) -> Result<PathBuf> {
    let path = dir.as_ref().join(format!("{name}.jsonl"));
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write_jsonl(&mut writer, records)?;
    writer.flush()?;
    info!(path = %path.display(), records = records.len(), "summaries exported");
    Ok(path)
}
