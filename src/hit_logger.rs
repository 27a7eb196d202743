use crate::error::{DrumError, DrumResult};
use crate::types::HitEvent;
use crossbeam_channel::Receiver;
use log::{error, info};
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes every hit to `<output_dir>/session_<unix>/hits.jsonl`.
///
/// The first line is a header naming the kit; each following line is one
/// serialized `HitEvent`.
pub struct HitLogger {
    rx: Receiver<HitEvent>,
    session_dir: PathBuf,
    drums: Vec<String>,
}

impl HitLogger {
    pub fn new(rx: Receiver<HitEvent>, output_dir: &Path, drums: Vec<String>) -> DrumResult<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let session_dir = output_dir.join(format!("session_{}", timestamp));
        fs::create_dir_all(&session_dir).map_err(|source| DrumError::Io {
            path: session_dir.clone(),
            source,
        })?;
        Ok(Self {
            rx,
            session_dir,
            drums,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger until every sender is dropped. Blocks the calling thread.
    pub fn run(&self) -> DrumResult<u64> {
        let path = self.session_dir.join("hits.jsonl");
        info!("Hit logger → {:?}", path);
        let io_err = |source: std::io::Error| DrumError::Io {
            path: path.clone(),
            source,
        };

        let mut out = BufWriter::new(File::create(&path).map_err(io_err)?);
        let header = json!({
            "format": "stick-drums",
            "version": env!("CARGO_PKG_VERSION"),
            "drums": self.drums,
        });
        writeln!(out, "{}", header).map_err(io_err)?;

        let mut count: u64 = 0;
        for hit in self.rx.iter() {
            match serde_json::to_string(&hit) {
                Ok(line) => writeln!(out, "{}", line).map_err(io_err)?,
                Err(e) => {
                    error!("Failed to serialize hit: {}", e);
                    continue;
                }
            }
            count += 1;
            if count % 100 == 0 {
                out.flush().map_err(io_err)?;
                info!("Logged {} hits", count);
            }
        }
        out.flush().map_err(io_err)?;

        info!("Hit log saved: {} hits → {:?}", count, path);
        Ok(count)
    }
}
