//! Burst test - admission control under load
//!
//! Fires a burst of tasks at a small global pool, shows how many the
//! non-blocking path rejects, pushes the rest through the retrying path,
//! then issues a handful of pulls, some of which time out.
//!
//! Usage: burst [tasks] [max_tasks]

use relay::{
    anyway_go, go, is_conn_rerror, Args, Packet, PeerConfig, PullCmd, RERR_DIAL_FAILED,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() {
    println!("=== Relay Burst Test ===\n");

    let mut args = std::env::args().skip(1);
    let num_tasks: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(64);
    let max_tasks: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(8);

    let config = PeerConfig::from_env()
        .max_tasks(max_tasks)
        .count_time(true)
        .default_timeout(Duration::from_millis(200));
    config.print();
    if let Err(e) = config.apply() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Phase 1: non-blocking burst
    let completed = Arc::new(AtomicUsize::new(0));
    let mut rejected = Vec::new();
    let start = Instant::now();

    for i in 0..num_tasks {
        let completed = Arc::clone(&completed);
        let work = move || {
            std::thread::sleep(Duration::from_millis(20));
            completed.fetch_add(1, Ordering::Relaxed);
        };
        if !go(work) {
            rejected.push(i);
        }
    }
    println!(
        "\nBurst: {} submitted, {} accepted, {} rejected",
        num_tasks,
        num_tasks - rejected.len(),
        rejected.len()
    );

    // Phase 2: retry the rejected ones until admitted
    for _ in &rejected {
        let completed = Arc::clone(&completed);
        anyway_go(move || {
            std::thread::sleep(Duration::from_millis(20));
            completed.fetch_add(1, Ordering::Relaxed);
        });
    }
    while completed.load(Ordering::Relaxed) < num_tasks {
        if start.elapsed() > Duration::from_secs(60) {
            println!("Timeout! Only {}/{} completed", completed.load(Ordering::Relaxed), num_tasks);
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    println!("All tasks done in {:?}", start.elapsed());

    // Phase 3: pulls
    println!("\nPulls:");
    let cmds: Vec<_> = (0..6u64)
        .map(|i| {
            let packet = Packet::new()
                .with_seq(i)
                .with_uri(format!("/burst/echo?n={}", i));
            config.pull(packet, move |out, ctx| {
                match i % 3 {
                    0 => {
                        let mut meta = Args::new();
                        meta.add("X-Seq", out.seq().to_string());
                        Ok((out.uri().to_string(), meta))
                    }
                    1 => Err(RERR_DIAL_FAILED.with_reason("connection refused")),
                    _ => {
                        // Slower than the default timeout
                        ctx.sleep(Duration::from_secs(1));
                        Ok((String::new(), Args::new()))
                    }
                }
            })
        })
        .collect();

    for cmd in &cmds {
        match cmd.result() {
            (Some(reply), _) => println!(
                "  {:<20} ok     {:?} meta={:?} cost={:?}",
                cmd.output().uri(),
                reply,
                cmd.input_meta().get("X-Seq"),
                cmd.cost_time()
            ),
            (_, Some(e)) => println!(
                "  {:<20} error  {} (conn={})",
                cmd.output().uri(),
                e,
                is_conn_rerror(Some(e))
            ),
            (None, None) => println!("  {:<20} empty", cmd.output().uri()),
        }
    }
}
