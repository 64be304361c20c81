use clap::Parser;
use paxtier_storage::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    let args = Args::parse();
    let config = StorageConfig::default()
        .block_capacity(args.block_capacity)
        .volatile_arena_size(args.arena_size);
    let engine = StorageEngine::new(config).unwrap();
    let relation = engine
        .create_relation(
            1,
            RelationSpec::new(
                "bench",
                vec![
                    ColumnGroupSpec::new(0, args.hot_tuple_size, vec![0, 1]),
                    ColumnGroupSpec::new(1, args.cold_tuple_size, vec![2, 3]),
                ],
            ),
        )
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let start = Instant::now();
    let mut handles = vec![];
    for _ in 0..args.threads {
        let relation = Arc::clone(&relation);
        let stop = Arc::clone(&stop);
        let batch_size = args.batch_size;
        let handle = thread::spawn(move || {
            let mut ops = 0usize;
            let mut batch = Vec::with_capacity(batch_size);
            while !stop.load(Ordering::Relaxed) {
                for _ in 0..batch_size {
                    batch.push(relation.claim_slot(MemTier::Volatile).unwrap());
                }
                for slot in batch.drain(..) {
                    relation.release_slot(slot).unwrap();
                }
                ops += batch_size * 2;
            }
            ops
        });
        handles.push(handle);
    }

    thread::sleep(args.duration);
    stop.store(true, Ordering::SeqCst);

    let mut ops = 0usize;
    for h in handles {
        ops += h.join().unwrap();
    }
    let dur = start.elapsed();
    println!(
        "threads={}, capacity={}, blocks={}, dur={}ms, {:.0} ops/s",
        args.threads,
        args.block_capacity,
        relation.total_block_count(),
        dur.as_millis(),
        ops as f64 / dur.as_secs_f64()
    );
}

#[derive(Parser, Clone)]
struct Args {
    /// claimant threads.
    #[arg(long, default_value = "4")]
    threads: usize,

    /// slots per fixed block.
    #[arg(long, default_value = "1024")]
    block_capacity: usize,

    /// tuple bytes of the first column group.
    #[arg(long, default_value = "16")]
    hot_tuple_size: usize,

    /// tuple bytes of the second column group.
    #[arg(long, default_value = "64")]
    cold_tuple_size: usize,

    /// slots claimed per thread before releasing them all.
    #[arg(long, default_value = "256")]
    batch_size: usize,

    /// volatile arena bytes.
    #[arg(long, default_value = "268435456")]
    arena_size: u64,

    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    duration: Duration,
}
