//! Simulation statistics collection and reporting.
//!
//! Tracks batch durations, packet and message latencies, reorder-buffer
//! occupancy, and per-class sent/retired counts, and renders them as a
//! human-readable table, a CSV row fragment, or JSON.

use serde::Serialize;
use std::io::{self, Write};
use std::time::Instant;

/// Running min/average/max over a sample stream.
#[derive(Clone, Debug, Serialize)]
pub struct SampleStats {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for SampleStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: 0.0,
            max: 0.0,
        }
    }
}

impl SampleStats {
    pub fn add_sample(&mut self, value: f64) {
        if self.count == 0 || value < self.min {
            self.min = value;
        }
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Simulation statistics structure tracking all run metrics.
#[derive(Serialize)]
pub struct SimStats {
    #[serde(skip)]
    start_time: Instant,
    pub cycles: u64,

    pub batch_time: SampleStats,
    pub inject_time: SampleStats,

    pub rob_occupancy: SampleStats,
    pub rob_high_water: usize,

    pub packet_latency: Vec<SampleStats>,
    pub message_latency: Vec<SampleStats>,

    pub sent_messages: Vec<u64>,
    pub retired_messages: Vec<u64>,
    pub sent_flits: Vec<u64>,
    pub retired_flits: Vec<u64>,
}

impl SimStats {
    pub fn new(classes: usize) -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            batch_time: SampleStats::default(),
            inject_time: SampleStats::default(),
            rob_occupancy: SampleStats::default(),
            rob_high_water: 0,
            packet_latency: vec![SampleStats::default(); classes],
            message_latency: vec![SampleStats::default(); classes],
            sent_messages: vec![0; classes],
            retired_messages: vec![0; classes],
            sent_flits: vec![0; classes],
            retired_flits: vec![0; classes],
        }
    }

    /// Prints a formatted summary of all simulation statistics.
    pub fn print(&self) {
        let duration = self.start_time.elapsed();
        let seconds = duration.as_secs_f64();
        let khz = (self.cycles as f64 / seconds) / 1000.0;

        println!("\n==========================================================");
        println!("BATCH TRAFFIC SIMULATION STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        println!("sim_cycles               {}", self.cycles);
        println!("sim_freq                 {:.2} kHz", khz);
        println!("----------------------------------------------------------");
        println!("BATCH DURATION");
        println!("  batches                {}", self.batch_time.count());
        println!("  min                    {:.0}", self.batch_time.min());
        println!("  avg                    {:.2}", self.batch_time.average());
        println!("  max                    {:.0}", self.batch_time.max());
        println!(
            "  injection phase avg    {:.2}",
            self.inject_time.average()
        );
        println!("----------------------------------------------------------");
        println!("REORDER BUFFER");
        println!("  occupancy avg          {:.2}", self.rob_occupancy.average());
        println!("  occupancy max sampled  {:.0}", self.rob_occupancy.max());
        println!("  high water             {}", self.rob_high_water);
        println!("----------------------------------------------------------");
        println!("TRAFFIC CLASSES");
        for c in 0..self.sent_messages.len() {
            println!("  class {}", c);
            println!(
                "    messages sent        {} (retired {})",
                self.sent_messages[c], self.retired_messages[c]
            );
            println!(
                "    flits sent           {} (retired {})",
                self.sent_flits[c], self.retired_flits[c]
            );
            println!(
                "    packet latency       min {:.0} / avg {:.2} / max {:.0}",
                self.packet_latency[c].min(),
                self.packet_latency[c].average(),
                self.packet_latency[c].max()
            );
            println!(
                "    message latency      min {:.0} / avg {:.2} / max {:.0}",
                self.message_latency[c].min(),
                self.message_latency[c].average(),
                self.message_latency[c].max()
            );
        }
        println!("==========================================================");
    }

    /// Appends the batch-duration columns to the per-class latency row.
    pub fn overall_stats_csv(&self, class: usize) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.packet_latency[class].min(),
            self.packet_latency[class].average(),
            self.packet_latency[class].max(),
            self.batch_time.min(),
            self.batch_time.average(),
            self.batch_time.max()
        )
    }

    /// Free-form text summary in the `name = value;` statement form.
    pub fn write_stats(&self, os: &mut impl Write) -> io::Result<()> {
        writeln!(os, "sim_cycles = {};", self.cycles)?;
        writeln!(os, "batch_time = {};", self.batch_time.average())?;
        writeln!(os, "rob_high_water = {};", self.rob_high_water)?;
        for c in 0..self.packet_latency.len() {
            writeln!(
                os,
                "packet_latency({}) = {};",
                c,
                self.packet_latency[c].average()
            )?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
