// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! udpchan-probe - UDP round-trip probe
//!
//! Measures round-trip latency with a ping/pong pair of datagram channels.
//! The pong side blocks in `receive`; Ctrl+C closes its channel, which
//! releases the blocked call.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use udpchan::{
    ByteBuffer, ByteChannel, ChannelConfig, ChannelError, DatagramChannel, OsNetwork,
    MAX_DATAGRAM_SIZE,
};

/// Bytes of sequence number at the front of every ping.
const SEQ_LEN: usize = 8;

/// UDP round-trip probe
#[derive(Parser, Debug)]
#[command(name = "udpchan-probe")]
#[command(version)]
#[command(about = "Measure UDP round-trip latency over udpchan channels")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Poll interval of blocking calls, in milliseconds
    #[arg(long, default_value = "50", global = true)]
    poll_ms: u64,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Send pings to a pong responder and report round-trip times
    Ping {
        /// Address of the pong responder
        #[arg(short, long, default_value = "127.0.0.1:7400")]
        target: SocketAddr,

        /// Payload size in bytes (at least 8)
        #[arg(short = 's', long, default_value = "64")]
        size: usize,

        /// Number of measured pings
        #[arg(short = 'n', long, default_value = "1000")]
        count: u64,

        /// Warmup pings before measurement
        #[arg(short, long, default_value = "10")]
        warmup: u64,

        /// Interval between pings in microseconds
        #[arg(short, long, default_value = "1000")]
        interval: u64,

        /// Per-ping timeout in milliseconds
        #[arg(long, default_value = "1000")]
        timeout_ms: u64,

        /// Output JSON results
        #[arg(long)]
        json: bool,

        /// Quiet mode - only output final results
        #[arg(long)]
        quiet: bool,
    },
    /// Echo every datagram back to its sender
    Pong {
        /// Local address to listen on
        #[arg(short, long, default_value = "0.0.0.0:7400")]
        bind: SocketAddr,

        /// Quiet mode
        #[arg(long)]
        quiet: bool,
    },
}

fn main() {
    // RUST_LOG=udpchan=debug shows channel lifecycle events
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = ChannelConfig {
        poll_interval: Duration::from_millis(args.poll_ms),
        ..ChannelConfig::from_env()
    }
    .normalized();

    match &args.mode {
        Mode::Ping {
            target,
            size,
            count,
            warmup,
            interval,
            timeout_ms,
            json,
            quiet,
        } => {
            let plan = PingPlan {
                target: *target,
                size: (*size).clamp(SEQ_LEN, MAX_DATAGRAM_SIZE),
                count: *count,
                warmup: *warmup,
                interval: Duration::from_micros(*interval),
                timeout: Duration::from_millis(*timeout_ms),
            };
            run_ping(config, &plan, *json, *quiet)
        }
        Mode::Pong { bind, quiet } => run_pong(config, *bind, *quiet),
    }
}

struct PingPlan {
    target: SocketAddr,
    size: usize,
    count: u64,
    warmup: u64,
    interval: Duration,
    timeout: Duration,
}

fn run_ping(
    config: ChannelConfig,
    plan: &PingPlan,
    json: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    if !quiet && !json {
        eprintln!("{} UDP probe (ping mode)", ">>>".green().bold());
        eprintln!(
            "    target={}, size={} bytes, count={}, warmup={}",
            plan.target, plan.size, plan.count, plan.warmup
        );
    }

    let channel = DatagramChannel::builder(Arc::new(OsNetwork::new()))
        .config(config)
        .blocking(false)
        .build()?;
    channel.connect(plan.target)?;
    log::debug!("ping channel local={:?}", channel.local_address());

    let mut payload = vec![0u8; plan.size];
    let mut reply = ByteBuffer::allocate(plan.size);
    let mut latencies: Vec<f64> = Vec::with_capacity(plan.count as usize);
    let mut lost = 0u64;
    let start_time = Instant::now();

    for seq in 0..plan.warmup + plan.count {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let is_warmup = seq < plan.warmup;
        payload[..SEQ_LEN].copy_from_slice(&seq.to_le_bytes());

        let send_time = Instant::now();
        channel.write(&mut ByteBuffer::copy_from_slice(&payload))?;

        let rtt = await_echo(&channel, &mut reply, seq, send_time, plan.timeout)?;
        match rtt {
            Some(rtt) if !is_warmup => latencies.push(rtt.as_secs_f64() * 1_000_000.0),
            None if !is_warmup => lost += 1,
            _ => {}
        }

        if !quiet && !json && !is_warmup {
            let measured = seq - plan.warmup + 1;
            if measured % 100 == 0 || measured == plan.count {
                eprint!("\r    Progress: {}/{}", measured, plan.count);
                let _ = io::stderr().flush();
            }
        }

        if !plan.interval.is_zero() {
            std::thread::sleep(plan.interval);
        }
    }

    let total_time = start_time.elapsed();
    if !quiet && !json {
        eprintln!();
    }

    let stats = Stats::from_samples(&latencies, lost);
    if json {
        print_json(&stats, plan.size, total_time);
    } else {
        print_results(&stats, plan.size, total_time, quiet);
    }
    channel.close()?;
    Ok(())
}

/// Poll the non-blocking channel until the echo of `seq` arrives or the
/// timeout passes. Stale echoes from earlier pings are skipped.
fn await_echo(
    channel: &DatagramChannel,
    reply: &mut ByteBuffer,
    seq: u64,
    sent_at: Instant,
    timeout: Duration,
) -> udpchan::Result<Option<Duration>> {
    let deadline = sent_at + timeout;
    while Instant::now() < deadline {
        reply.clear();
        let n = match channel.read(reply) {
            Ok(n) => n,
            // Responder not up yet: the kernel reports the ICMP error here.
            Err(ChannelError::Io(e)) if e.kind() == io::ErrorKind::ConnectionRefused => 0,
            Err(e) => return Err(e),
        };
        if n >= SEQ_LEN {
            let mut echoed = [0u8; SEQ_LEN];
            echoed.copy_from_slice(&reply.filled()[..SEQ_LEN]);
            if u64::from_le_bytes(echoed) == seq {
                return Ok(Some(sent_at.elapsed()));
            }
            continue;
        }
        std::thread::sleep(Duration::from_micros(10));
    }
    Ok(None)
}

fn run_pong(
    config: ChannelConfig,
    bind: SocketAddr,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let channel = Arc::new(
        DatagramChannel::builder(Arc::new(OsNetwork::new()))
            .config(config)
            .build()?,
    );
    channel.bind(bind)?;

    let closer = Arc::clone(&channel);
    ctrlc::set_handler(move || {
        if let Err(e) = closer.close() {
            eprintln!("{}: {}", "Warning".yellow(), e);
        }
    })?;

    if !quiet {
        eprintln!("{} UDP probe (pong mode)", ">>>".green().bold());
        eprintln!("    listening on {:?}", channel.local_address());
        eprintln!("{}", "    Press Ctrl+C to stop".dimmed());
        eprintln!();
    }

    let mut buf = ByteBuffer::allocate(MAX_DATAGRAM_SIZE);
    let mut echoed = 0u64;
    while channel.is_open() {
        buf.clear();
        let from = match channel.receive(&mut buf) {
            Ok(Some(from)) => from,
            Ok(None) => continue,
            Err(ChannelError::Closed) => break,
            Err(e) => return Err(e.into()),
        };
        buf.flip();
        match channel.send(&mut buf, from) {
            Ok(_) => {
                echoed += 1;
                if !quiet && echoed % 100 == 0 {
                    eprint!("\r    Echoed: {} datagrams", echoed);
                    let _ = io::stderr().flush();
                }
            }
            Err(e) if channel.is_open() => {
                if !quiet {
                    eprintln!("{}: echo to {} failed: {}", "Warning".yellow(), from, e);
                }
            }
            Err(_) => break,
        }
    }

    if !quiet {
        eprintln!("\n\n{} Echoed {} total datagrams", "---".dimmed(), echoed);
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Stats {
    count: usize,
    lost: u64,
    min: f64,
    max: f64,
    mean: f64,
    p50: f64,
    p99: f64,
}

impl Stats {
    fn from_samples(latencies: &[f64], lost: u64) -> Self {
        if latencies.is_empty() {
            return Self {
                lost,
                ..Self::default()
            };
        }
        let mut sorted = latencies.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let percentile = |p: f64| {
            let idx = ((p / 100.0) * (n - 1) as f64).round() as usize;
            sorted[idx.min(n - 1)]
        };
        Self {
            count: n,
            lost,
            min: sorted[0],
            max: sorted[n - 1],
            mean: sorted.iter().sum::<f64>() / n as f64,
            p50: percentile(50.0),
            p99: percentile(99.0),
        }
    }

    fn loss_pct(&self) -> f64 {
        let total = self.count as u64 + self.lost;
        if total == 0 {
            0.0
        } else {
            self.lost as f64 * 100.0 / total as f64
        }
    }
}

fn print_results(stats: &Stats, size: usize, total_time: Duration, quiet: bool) {
    if quiet {
        println!(
            "min={:.1} max={:.1} avg={:.1} p99={:.1} us",
            stats.min, stats.max, stats.mean, stats.p99
        );
        return;
    }
    println!();
    println!("{}", "=== Round-trip latency ===".bold());
    println!("    payload   {} bytes", size);
    println!(
        "    samples   {} ({} lost, {:.2}%)",
        stats.count,
        stats.lost,
        stats.loss_pct()
    );
    println!("    min       {:.1} us", stats.min);
    println!("    mean      {:.1} us", stats.mean);
    println!("    p50       {:.1} us", stats.p50);
    println!("    p99       {}", format!("{:.1} us", stats.p99).yellow());
    println!("    max       {:.1} us", stats.max);
    println!("    elapsed   {:.2} s", total_time.as_secs_f64());
}

fn print_json(stats: &Stats, size: usize, total_time: Duration) {
    println!(
        "{{\"size\":{},\"count\":{},\"lost\":{},\"min_us\":{:.2},\"max_us\":{:.2},\"mean_us\":{:.2},\"p50_us\":{:.2},\"p99_us\":{:.2},\"elapsed_s\":{:.3}}}",
        size,
        stats.count,
        stats.lost,
        stats.min,
        stats.max,
        stats.mean,
        stats.p50,
        stats.p99,
        total_time.as_secs_f64()
    );
}
