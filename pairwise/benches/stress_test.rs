use pairwise::{mine_from_chunks, mine_rules, InputOrder, MinerConfig, TransactionItem};
use rand::Rng;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Path to a `transaction_id,item_id` CSV (with header) of the 32M-row
/// reference dataset.
const REFERENCE_CSV_ENV: &str = "PAIRWISE_REFERENCE_CSV";

/// Stage counts of the reference dataset at 0.01% minimum support.
const REFERENCE_INPUT_RECORDS: usize = 32_434_489;
const REFERENCE_QUALIFYING_ITEMS: usize = 10_906;
const REFERENCE_ITEM_PRUNED_RECORDS: usize = 29_843_570;
const REFERENCE_QUALIFYING_TRANSACTIONS: usize = 3_013_325;
const REFERENCE_RAW_PAIRS: usize = 30_622_410;
const REFERENCE_SURVIVING_PAIRS: usize = 48_751;

fn generate_records(
    num_transactions: usize,
    num_items: usize,
    avg_transaction_size: usize,
    skew: f64,
) -> Vec<TransactionItem> {
    let mut rng = rand::thread_rng();
    let popular = (num_items / 10).max(1);
    let mut records = Vec::with_capacity(num_transactions * avg_transaction_size);

    for tx_idx in 0..num_transactions {
        let random_factor: f64 = rng.r#gen();
        let num_items_in_tx = (avg_transaction_size as f64 * (0.5 + random_factor)).round() as usize;

        for _ in 0..num_items_in_tx {
            let skew_check: f64 = rng.r#gen();
            let item = if skew_check < skew {
                rng.gen_range(0..popular)
            } else {
                rng.gen_range(0..num_items)
            };
            records.push(TransactionItem::new(tx_idx as i64, item as i64));
        }
    }

    records
}

fn print_memory_stats() {
    #[cfg(any(target_os = "macos", target_os = "linux"))]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("ps")
            .args(["-o", "rss=", "-p", &std::process::id().to_string()])
            .output()
        {
            if let Ok(rss) = String::from_utf8(output.stdout) {
                if let Ok(kb) = rss.trim().parse::<usize>() {
                    println!("  Memory: {} MB", kb / 1024);
                }
            }
        }
    }
}

fn stress_test_scaling() {
    println!("\n=== Scaling Test ===");

    let configs = vec![
        ("100K tx x 5K items", 100_000, 5_000, 10),
        ("500K tx x 10K items", 500_000, 10_000, 10),
        ("1M tx x 20K items", 1_000_000, 20_000, 10),
    ];

    for (name, num_tx, num_items, avg_size) in configs {
        println!("\nTesting: {}", name);
        let start_gen = Instant::now();
        let records = generate_records(num_tx, num_items, avg_size, 0.5);
        println!("  Generated {} records in {:?}", records.len(), start_gen.elapsed());
        print_memory_stats();

        for parallel in [false, true] {
            let config = MinerConfig::new(0.01).unwrap().with_parallel(parallel);
            let start = Instant::now();
            match mine_rules(records.iter().copied(), &config) {
                Ok(outcome) => {
                    println!(
                        "  {} run: {:?}, {} raw pairs, {} rules",
                        if parallel { "parallel" } else { "sequential" },
                        start.elapsed(),
                        outcome.summary.raw_pairs,
                        outcome.rules.len()
                    );
                }
                Err(err) => println!("  ✗ {}", err),
            }
            print_memory_stats();
        }
    }
}

fn stress_test_engine_vs_streaming() {
    println!("\n=== Engine vs Streaming Comparison ===");

    let records = generate_records(200_000, 8_000, 12, 0.6);
    let config = MinerConfig::new(0.01).unwrap();

    let start = Instant::now();
    let engine = mine_rules(records.iter().copied(), &config).unwrap();
    let engine_time = start.elapsed();
    println!("  Engine: {:?}, {} rules", engine_time, engine.rules.len());
    print_memory_stats();

    let chunk_size = 50_000;
    let start = Instant::now();
    let streamed = mine_from_chunks(|| records.chunks(chunk_size), &config).unwrap();
    let streaming_time = start.elapsed();
    println!("  Streaming: {:?}, {} rules", streaming_time, streamed.rules.len());
    print_memory_stats();

    let overhead = (streaming_time.as_secs_f64() / engine_time.as_secs_f64() - 1.0) * 100.0;
    println!("  Overhead: {:.1}%", overhead);
    println!("  Same rules: {}", engine.rules == streamed.rules);
}

fn stress_test_memory_budget() {
    println!("\n=== Pair Table Budget Test ===");

    let records = generate_records(100_000, 20_000, 20, 0.0);
    for limit_mb in [1usize, 16, 256] {
        let config = MinerConfig::new(0.001)
            .unwrap()
            .with_pair_memory_limit(limit_mb * 1024 * 1024);
        match mine_rules(records.iter().copied(), &config) {
            Ok(outcome) => println!(
                "  {} MB: ok, {} distinct pairs",
                limit_mb, outcome.summary.distinct_pairs
            ),
            Err(err) => println!("  {} MB: {}", limit_mb, err),
        }
    }
}

fn read_reference_csv(path: &str) -> Vec<TransactionItem> {
    let content = std::fs::read_to_string(path).expect("readable reference CSV");
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split(',');
            let transaction_id = fields.next()?.trim().parse().ok()?;
            let item_id = fields.next()?.trim().parse().ok()?;
            Some(TransactionItem::new(transaction_id, item_id))
        })
        .collect()
}

fn reference_regression() {
    let Ok(path) = std::env::var(REFERENCE_CSV_ENV) else {
        println!("\n=== Reference Regression skipped ({} not set) ===", REFERENCE_CSV_ENV);
        return;
    };
    println!("\n=== Reference Regression ===");

    let records = read_reference_csv(&path);
    let config = MinerConfig::new(0.01)
        .unwrap()
        .with_input_order(InputOrder::Unsorted);
    let start = Instant::now();
    let outcome = mine_rules(records, &config).unwrap();
    println!("  Completed in {:?}", start.elapsed());
    print_memory_stats();

    let summary = &outcome.summary;
    let checks = [
        ("input records", summary.input_records, REFERENCE_INPUT_RECORDS),
        ("qualifying items", summary.qualifying_items, REFERENCE_QUALIFYING_ITEMS),
        ("records after item pruning", summary.item_pruned_records, REFERENCE_ITEM_PRUNED_RECORDS),
        ("qualifying transactions", summary.qualifying_transactions, REFERENCE_QUALIFYING_TRANSACTIONS),
        ("raw pairs", summary.raw_pairs, REFERENCE_RAW_PAIRS),
        ("surviving pairs", summary.surviving_pairs, REFERENCE_SURVIVING_PAIRS),
    ];
    for (label, actual, expected) in checks {
        let mark = if actual == expected { "✓" } else { "✗" };
        println!("  {} {}: {} (expected {})", mark, label, actual, expected);
    }
    println!("  distinct transactions: {}", summary.distinct_transactions);
    println!("  records after size pruning: {}", summary.size_pruned_records);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Pair Rule Stress Testing Suite ===");
    println!("Testing memory bounds, parallel counting and streaming passes\n");

    stress_test_scaling();
    stress_test_engine_vs_streaming();
    stress_test_memory_budget();
    reference_regression();

    println!("\n=== Stress Testing Complete ===");
}
