//! Batch Traffic Simulator CLI.
//!
//! The main executable for the traffic front end. It handles
//! command-line argument parsing, configuration loading, the batch run,
//! and the final statistics report.

use clap::Parser;
use std::{fs, process};

extern crate noc_traffic;

use noc_traffic::config::Config;
use noc_traffic::sim::fabric::LatencyFabric;
use noc_traffic::sim::BatchSimulation;

/// Command-line arguments for the batch traffic simulator.
#[derive(Parser, Debug)]
#[command(author, version, about = "Batch traffic front end for interconnect simulation")]
struct Args {
    #[arg(short, long, default_value = "configs/default.toml")]
    config: String,

    /// Override the configured batch count.
    #[arg(long)]
    batches: Option<u64>,

    /// Override the configured random seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the end-of-run statistics as JSON to this path.
    #[arg(long)]
    json_stats: Option<String>,

    /// Print the per-class overall CSV row fragments after the run.
    #[arg(long)]
    csv: bool,
}

/// Main entry point for the batch traffic simulator.
///
/// # Behavior
///
/// 1. **Configuration**: parses command-line arguments and loads the
///    TOML configuration file.
/// 2. **Initialization**: constructs the latency-model fabric and the
///    batch simulation.
/// 3. **Run**: executes every configured batch plus the terminal drain.
/// 4. **Teardown**: prints the statistics table and the optional CSV
///    and JSON outputs.
fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[!] FATAL: {}", e);
            process::exit(1);
        }
    };
    if let Some(batches) = args.batches {
        config.batch.count = batches;
    }
    if let Some(seed) = args.seed {
        config.general.seed = seed;
    }

    println!("Global Configuration");
    println!("--------------------");
    println!("General:");
    println!("  Nodes:              {}", config.general.nodes);
    println!("  Classes:            {}", config.general.classes);
    println!("  Seed:               {}", config.general.seed);
    println!("Traffic:");
    println!("  Patterns:           {:?}", config.traffic.patterns);
    println!("  Injection:          {:?}", config.traffic.injection_process);
    println!("  Rates:              {:?}", config.traffic.rates);
    println!("Batch:");
    println!("  Size:               {}", config.batch.size);
    println!("  Count:              {}", config.batch.count);
    println!("  Max Outstanding:    {}", config.batch.max_outstanding);
    println!("Reorder:");
    println!("  Granularity:        {}", config.reorder.granularity);
    println!("Fabric:");
    println!("  Latency:            {} cycles", config.fabric.latency);
    println!("  Jitter:             {} cycles", config.fabric.jitter);
    println!("--------------------");

    let fabric = LatencyFabric::new(
        config.fabric.latency,
        config.fabric.jitter,
        config.general.seed.wrapping_add(1),
    );
    let mut sim = match BatchSimulation::new(&config, fabric) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("[!] FATAL: {}", e);
            process::exit(1);
        }
    };

    sim.run();
    sim.stats().print();

    if args.csv {
        for class in 0..config.general.classes {
            println!("{}", sim.stats().overall_stats_csv(class));
        }
    }
    if let Some(path) = args.json_stats {
        match sim.stats().to_json() {
            Ok(json) => {
                if let Err(e) = fs::write(&path, json) {
                    eprintln!("[!] Could not write {}: {}", path, e);
                    process::exit(1);
                }
                println!("[*] Wrote statistics to {}", path);
            }
            Err(e) => {
                eprintln!("[!] Could not serialize statistics: {}", e);
                process::exit(1);
            }
        }
    }
}
