//! JSON Exporter
//!
//! Writes graph snapshots to `network/` and the per-tick series plus the
//! message log to `data/` under the output directory.

use echo_events::{generate_snapshot_id, Message, TickSeries};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::agent::Agent;
use crate::error::SimResult;
use crate::graph::SocialGraph;

use super::{capture_snapshot, Exporter, History, MessageLogger};

pub const DATA_DIR: &str = "data";
pub const NETWORK_DIR: &str = "network";
pub const MESSAGES_FILE: &str = "messages.jsonl";
pub const OPINIONS_FILE: &str = "opinions.jsonl";
pub const SCREEN_DIVERSITY_FILE: &str = "screen_diversity.jsonl";

/// Exporter writing JSON snapshots and JSONL series
pub struct JsonExporter {
    data_dir: PathBuf,
    network_dir: PathBuf,
    messages: MessageLogger,
    snapshot_count: u64,
    last_snapshot: Option<u64>,
}

impl JsonExporter {
    /// Create the output directories and open the message log
    pub fn new(output_dir: impl AsRef<Path>) -> SimResult<Self> {
        let data_dir = output_dir.as_ref().join(DATA_DIR);
        let network_dir = output_dir.as_ref().join(NETWORK_DIR);
        fs::create_dir_all(&data_dir)?;
        fs::create_dir_all(&network_dir)?;

        let messages = MessageLogger::new(data_dir.join(MESSAGES_FILE))?;
        Ok(Self {
            data_dir,
            network_dir,
            messages,
            snapshot_count: 0,
            last_snapshot: None,
        })
    }

    /// Number of distinct snapshot files written
    pub fn snapshot_count(&self) -> u64 {
        self.snapshot_count
    }

    fn snapshot_path(&self, tick: u64) -> PathBuf {
        self.network_dir.join(format!("{}.json", generate_snapshot_id(tick)))
    }

    fn write_series(&self, file_name: &str, rows: &[TickSeries]) -> SimResult<()> {
        let file = File::create(self.data_dir.join(file_name))?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Exporter for JsonExporter {
    fn record_message(&mut self, msg: &Message) -> SimResult<()> {
        self.messages.log(msg)?;
        Ok(())
    }

    fn export_snapshot(
        &mut self,
        tick: u64,
        graph: &SocialGraph,
        agents: &[Agent],
    ) -> SimResult<()> {
        let snapshot = capture_snapshot(tick, graph, agents);
        let path = self.snapshot_path(tick);
        fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;

        // A final snapshot on a periodic tick overwrites the same file
        if self.last_snapshot == Some(tick) {
            tracing::info!("Replaced snapshot {}", path.display());
        } else {
            self.snapshot_count += 1;
            self.last_snapshot = Some(tick);
            tracing::info!("Wrote snapshot {}", path.display());
        }
        Ok(())
    }

    fn finish(
        &mut self,
        tick: u64,
        history: &History,
        graph: &SocialGraph,
        agents: &[Agent],
    ) -> SimResult<()> {
        self.write_series(OPINIONS_FILE, &history.opinions)?;
        self.write_series(SCREEN_DIVERSITY_FILE, &history.screen_diversity)?;
        self.messages.flush()?;
        self.export_snapshot(tick, graph, agents)?;

        tracing::info!(
            "Exported {} ticks of history and {} messages to {}",
            history.len(),
            self.messages.message_count(),
            self.data_dir.display()
        );
        Ok(())
    }
}
