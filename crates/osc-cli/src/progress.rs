//! 📊 "Is the snapshot done yet?" answered with a progress bar instead of a shrug.
//!
//! Fed by `_snapshot/{repo}/{snap}/_status` polls. The bar counts shards, the table
//! underneath counts bytes and time.
//!
//! ⚠️ Watching it will not make it go faster. We've tried.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};
use osc::api::snapshot::SnapshotStatus;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;
const RATE_WINDOW: Duration = Duration::from_secs(5);

/// 📦 Bytes for humans, scaled to the biggest sensible unit.
fn format_bytes(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} bytes")
    }
}

/// ⏱️ MM:SS, or HH:MM:SS for the long hauls. Order pizza. Plural.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

pub struct SnapshotProgress {
    name: String,
    bar: ProgressBar,
    /// (when, shards done) pairs from the last few seconds
    samples: VecDeque<(Instant, u64)>,
    started: Instant,
}

impl std::fmt::Debug for SnapshotProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar doesn't do Debug, and honestly, fair
        f.debug_struct("SnapshotProgress").field("name", &self.name).finish()
    }
}

impl SnapshotProgress {
    pub fn new(name: String) -> Self {
        // -- the total is unknown until the first status comes back
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{msg}\n| [{bar:40.cyan/blue}] {pos}/{len} shards")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);

        let started = Instant::now();
        Self {
            name,
            bar,
            samples: VecDeque::from([(started, 0)]),
            started,
        }
    }

    pub fn update(&mut self, status: &SnapshotStatus) {
        let shards = &status.shards_stats;
        let done = shards.done + shards.failed;
        self.bar.set_length(shards.total);
        self.bar.set_position(done);

        let shards_per_sec = self.shards_per_sec(done);
        self.render(status, shards_per_sec);
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    fn shards_per_sec(&mut self, done: u64) -> f64 {
        let now = Instant::now();
        while let Some(&(at, _)) = self.samples.front() {
            if now.duration_since(at) > RATE_WINDOW {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        self.samples.push_back((now, done));

        match self.samples.front() {
            Some(&(oldest_at, oldest_done)) => {
                let elapsed = now.duration_since(oldest_at).as_secs_f64();
                if elapsed > 0.0 {
                    done.saturating_sub(oldest_done) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    fn render(&self, status: &SnapshotStatus, shards_per_sec: f64) {
        let elapsed = self.started.elapsed();
        let fraction = status.progress();
        let remaining = if fraction > 0.0 && fraction < 1.0 {
            // 🔮 linear extrapolation, assumes the big shards aren't all at the end (they are)
            let total_estimated = elapsed.as_secs_f64() / fraction;
            format_duration(Duration::from_secs_f64(total_estimated - elapsed.as_secs_f64()))
        } else {
            "--:--".to_string()
        };

        let stats = &status.stats;
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{shards_per_sec:.2} shards/s")).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", fraction * 100.0)).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} files new", stats.incremental.file_count)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} files total", stats.total.file_count)).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} new", format_bytes(stats.incremental.size_in_bytes)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} total", format_bytes(stats.total.size_in_bytes))).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(elapsed))).set_alignment(CellAlignment::Right),
            Cell::new(format!("{remaining} remaining")).set_alignment(CellAlignment::Right),
        ]);

        self.bar
            .set_message(format!("snapshot: {} ({})\n{}", self.name, status.state, table));
    }
}
