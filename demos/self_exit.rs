//! # Demo: self_exit
//!
//! Two ways a child dies, side by side, with every lifecycle event logged.
//!
//! Shows how to:
//! - Install [`LogWriter`] and a `tracing_subscriber` formatter
//! - Spawn a child whose service returns on its own (self-exit)
//! - Spawn long-running children and force them down with [`Supervisor::terminate_all`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► spawn "one-shot"  ─► service returns ─► deregister == true ─► SelfExited
//!   ├─► spawn "poller" x2 ─► loop forever
//!   └─► terminate_all()
//!         ├─► publish TerminateRequested{count: 2}
//!         └─► per child: cleanup() ─► delete(context) ─► TaskTerminated
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example self_exit --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use taskparent::{Config, LogWriter, ServiceFn, SpawnOptions, Subscribe, Supervisor, TaskError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // 1. Supervisor with the logging subscriber
    let cfg = Config::default();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg.clone()).with_subscribers(subs).build();

    // 2. A child that finishes by itself
    let one_shot = ServiceFn::arc("one-shot", || async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<(), TaskError>(())
    });
    sup.spawn(one_shot, SpawnOptions::with_defaults(&cfg))?;

    // 3. Children that never finish; their cleanup runs on terminate_all
    for core in 0..2 {
        let poller = ServiceFn::new("poller", || async {
            for _ in 0u64.. {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok::<(), TaskError>(())
        })
        .with_cleanup(move || println!("[poller] cleanup on core {core}"));
        sup.spawn(
            Arc::new(poller),
            SpawnOptions::with_defaults(&cfg).named(format!("poller-{core}")),
        )?;
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("live children: {:?}", sup.children());

    // 4. Force the rest down
    sup.terminate_all();
    println!("live children after terminate_all: {}", sup.len());

    // 5. Dropping the supervisor flushes the subscriber queues
    drop(sup);
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
