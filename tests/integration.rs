use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use slot_pool::{CostEstimate, IdlePolicy, PoolConfig, PoolError, Stage, ThreadPool};

// cost high enough that every range is split across the full degree
const HEAVY: f64 = 1_000_000.0;

fn visited_exactly_once(pool: &ThreadPool, total: u64) {
    let visited: Vec<AtomicU32> = (0..total).map(|_| AtomicU32::new(0)).collect();

    pool.parallel_for(total, HEAVY, |start, end| {
        assert!(start < end, "empty chunk published");
        assert!(end <= total, "chunk beyond range end");
        for i in start..end {
            visited[i as usize].fetch_add(1, Ordering::Relaxed);
        }
    })
    .unwrap();

    for (i, count) in visited.iter().enumerate() {
        assert_eq!(
            count.load(Ordering::Relaxed),
            1,
            "index {} visited wrong number of times (total {})",
            i,
            total
        );
    }
}

#[test]
fn parallel_for_covers_range_exactly() {
    for threads in [1, 2, 3, 4, 7, 8, 16, 64] {
        let pool = slot_pool::with_threads(threads);
        for total in [1, 2, 3, 63, 64, 65, 100, 1000, 10000] {
            visited_exactly_once(&pool, total);
        }
    }
}

#[test]
fn zero_total_touches_no_slot() {
    let pool = slot_pool::with_threads(4);
    let calls = AtomicUsize::new(0);

    pool.parallel_for(0, HEAVY, |_, _| {
        calls.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 0);
    assert!(pool.slot_stages().iter().all(|&s| s == Stage::Empty));
}

#[test]
fn single_element_runs_on_one_chunk() {
    let pool = slot_pool::with_threads(8);
    let calls = AtomicUsize::new(0);

    pool.parallel_for(1, HEAVY, |start, end| {
        calls.fetch_add(1, Ordering::Relaxed);
        assert_eq!((start, end), (0, 1));
    })
    .unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 1, "oversubscribed one element");
}

#[test]
fn cheap_work_runs_inline() {
    let pool = slot_pool::with_threads(8);
    let calls = AtomicUsize::new(0);

    // total cost far below the chunking threshold: one chunk, caller thread
    pool.parallel_for(100, 1.0, |start, end| {
        calls.fetch_add(1, Ordering::Relaxed);
        assert_eq!((start, end), (0, 100));
    })
    .unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert!(pool.slot_stages().iter().all(|&s| s == Stage::Empty));
}

#[test]
fn expensive_work_uses_every_participant() {
    let pool = slot_pool::with_threads(8);
    let calls = AtomicUsize::new(0);

    pool.parallel_for(1_000_000, CostEstimate::new(8.0, 8.0, 100.0), |_, _| {
        calls.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    // 8 workers plus the caller
    assert_eq!(calls.load(Ordering::Relaxed), 9);
}

#[test]
fn simple_parallel_for_covers_indices() {
    let pool = slot_pool::with_threads(4);
    for total in [0u64, 1, 5, 100, 10000] {
        let visited: Vec<AtomicU32> = (0..total).map(|_| AtomicU32::new(0)).collect();
        pool.simple_parallel_for(total, |i| {
            visited[i as usize].fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        for (i, count) in visited.iter().enumerate() {
            assert_eq!(count.load(Ordering::Relaxed), 1, "index {}", i);
        }
    }
}

#[test]
fn schedule_does_not_block_caller() {
    let pool = slot_pool::with_threads(2);

    let start = Instant::now();
    pool.schedule(|| std::thread::sleep(Duration::from_millis(200)))
        .unwrap();
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_millis(100),
        "schedule blocked for {:?}",
        elapsed
    );
}

#[test]
fn scheduled_slot_returns_to_empty() {
    let pool = slot_pool::with_threads(2);
    pool.schedule(|| {}).unwrap();

    // liveness: the worker reclaims a fire-and-forget slot on its own
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if pool.slot_stages().iter().all(|&s| s == Stage::Empty) {
            break;
        }
        assert!(Instant::now() < deadline, "slot never returned to Empty");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn scheduled_task_eventually_runs() {
    let pool = slot_pool::with_threads(2);
    static RAN: AtomicUsize = AtomicUsize::new(0);

    for _ in 0..16 {
        pool.schedule(|| {
            RAN.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while RAN.load(Ordering::Relaxed) < 16 {
        assert!(Instant::now() < deadline, "scheduled tasks lost");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn concurrent_callers_share_the_pool() {
    let pool = slot_pool::with_threads(4);
    let iterations = 50;
    let total = 4096u64;

    std::thread::scope(|scope| {
        let mut observers = Vec::new();
        for _ in 0..2 {
            let pool = &pool;
            observers.push(scope.spawn(move || {
                let visited: Vec<AtomicU32> = (0..total).map(|_| AtomicU32::new(0)).collect();
                for _ in 0..iterations {
                    pool.parallel_for(total, HEAVY, |start, end| {
                        for i in start..end {
                            visited[i as usize].fetch_add(1, Ordering::Relaxed);
                        }
                    })
                    .unwrap();
                }
                for count in &visited {
                    assert_eq!(count.load(Ordering::Relaxed), iterations);
                }
            }));
        }

        // sample stages while both callers hammer the pool; every snapshot
        // must decode to a legal stage (slot_stages panics otherwise)
        for _ in 0..1000 {
            let stages = pool.slot_stages();
            assert_eq!(stages.len(), 4);
        }

        for observer in observers {
            observer.join().unwrap();
        }
    });
}

#[test]
fn drop_joins_all_workers() {
    let mut done = 0u64;
    {
        let pool = slot_pool::with_threads(4);
        pool.parallel_for(1000, HEAVY, |start, end| {
            std::hint::black_box(end - start);
        })
        .unwrap();
        done += 1;
        // pool drops here: flag, then join
    }
    assert_eq!(done, 1);

    // a fresh pool works after the previous one tore down
    let pool = slot_pool::with_threads(4);
    visited_exactly_once(&pool, 100);
}

#[test]
fn rejects_zero_threads() {
    match ThreadPool::new(PoolConfig::new(0)) {
        Err(PoolError::InvalidThreadCount) => {}
        other => panic!("expected InvalidThreadCount, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn rejects_uneven_shards() {
    match ThreadPool::new(PoolConfig::new(4).shards(3)) {
        Err(PoolError::InvalidLayout { shards: 3, threads: 4 }) => {}
        other => panic!("expected InvalidLayout, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn sharded_layout_behaves_like_flat() {
    let pool = ThreadPool::new(PoolConfig::new(8).shards(4)).unwrap();
    assert_eq!(pool.num_threads(), 8);
    visited_exactly_once(&pool, 10000);
}

#[test]
fn configured_pool_reports_thread_count() {
    let config = PoolConfig::new(3)
        .name_prefix("kernel")
        .denormal_as_zero(true)
        .idle(IdlePolicy {
            max_spins: 16,
            sleep: Duration::from_micros(50),
        });
    let pool = ThreadPool::new(config).unwrap();
    assert_eq!(pool.num_threads(), 3);
    visited_exactly_once(&pool, 1000);
}

#[test]
fn panicking_task_is_fatal() {
    // child mode: submit a panicking kernel and wait; the pool must kill
    // the process rather than strand the slot and swallow the error
    if std::env::var("SLOT_POOL_PANIC_CHILD").is_ok() {
        let pool = slot_pool::with_threads(2);
        pool.schedule(|| panic!("kernel failure")).unwrap();
        std::thread::sleep(Duration::from_secs(5));
        drop(pool);
        return;
    }

    let exe = std::env::current_exe().unwrap();
    let status = std::process::Command::new(exe)
        .args(["panicking_task_is_fatal", "--exact", "--test-threads=1"])
        .env("SLOT_POOL_PANIC_CHILD", "1")
        .status()
        .unwrap();

    assert!(
        !status.success(),
        "a panicking task left the process alive: {:?}",
        status
    );
}

#[test]
fn stage_transitions_follow_the_cycle() {
    let pool = slot_pool::with_threads(4);

    pool.start_profiling();
    for _ in 0..8 {
        pool.parallel_for(100_000, HEAVY, |start, end| {
            std::hint::black_box(end - start);
        })
        .unwrap();
    }
    let report = pool.stop_profiling();

    // per slot, the recorded events must repeat the publish/consume cycle
    // in order: claimed, published, started, finished, reclaimed
    const CYCLE: [&str; 5] = ["claimed", "published", "started", "finished", "reclaimed"];
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut events = 0;
    for line in report.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        // event lines read "<timestamp> slot <index> <transition>"
        if tokens.len() == 4 && tokens[1] == "slot" {
            let slot: usize = tokens[2].parse().unwrap();
            let expected = position.entry(slot).or_insert(0);
            assert_eq!(
                tokens[3], CYCLE[*expected],
                "slot {} broke the stage cycle:\n{}",
                slot, report
            );
            *expected = (*expected + 1) % CYCLE.len();
            events += 1;
        }
    }

    assert!(events > 0, "no slot events recorded:\n{report}");
    for (slot, expected) in position {
        assert_eq!(expected, 0, "slot {} stopped mid-cycle", slot);
    }
}

#[test]
fn profiling_window_reports_slot_events() {
    let pool = slot_pool::with_threads(4);

    pool.start_profiling();
    pool.parallel_for(100_000, HEAVY, |start, end| {
        std::hint::black_box(end - start);
    })
    .unwrap();
    let report = pool.stop_profiling();

    println!("{report}");
    assert!(report.contains("slot events"));
    assert!(report.contains("slot 0:"));

    // a second window starts clean
    pool.start_profiling();
    let report = pool.stop_profiling();
    assert!(report.contains("0 slot events"));
}
