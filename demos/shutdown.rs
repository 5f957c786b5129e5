//! # Demo: shutdown
//!
//! Runs a few workers until the process receives SIGINT/SIGTERM/SIGQUIT
//! (Ctrl-C on other platforms), then terminates them all.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► spawn "worker-0..3"
//!   ├─► watch events on Supervisor::subscribe()
//!   └─► terminate_on_signal().await
//!         └─► terminate_all() ─► TaskTerminated x N
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example shutdown
//! # then press Ctrl-C
//! ```

use std::sync::Arc;
use std::time::Duration;

use taskparent::{Config, EventKind, ServiceFn, SpawnOptions, Supervisor, TaskError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config {
        max_contexts: 8,
        ..Config::default()
    };
    let sup = Supervisor::new(cfg.clone());

    let mut events = sup.subscribe();
    tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            if matches!(ev.kind, EventKind::TaskTerminated | EventKind::SelfExited) {
                println!(
                    "[events] {:?} {}",
                    ev.kind,
                    ev.task.as_deref().unwrap_or("-")
                );
            }
        }
    });

    for i in 0..4u64 {
        let worker = ServiceFn::new("worker", move || async move {
            for tick in 1u64.. {
                tokio::time::sleep(Duration::from_millis(500 + i * 100)).await;
                println!("[worker-{i}] tick {tick}");
            }
            Ok::<(), TaskError>(())
        })
        .with_cleanup(move || println!("[worker-{i}] cleanup"));
        sup.spawn(
            Arc::new(worker),
            SpawnOptions::with_defaults(&cfg).named(format!("worker-{i}")),
        )?;
    }

    println!("running {} workers, press Ctrl-C to stop", sup.len());
    sup.terminate_on_signal().await?;
    println!("all workers terminated: {}", sup.is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
