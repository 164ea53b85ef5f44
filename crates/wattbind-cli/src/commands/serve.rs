//! Scheduler daemon: run every persisted daily job until interrupted.

use std::sync::Arc;

use wattbind_core::{HttpMessenger, NotificationScheduler};

use super::common::Ctx;

pub async fn run(ctx: Ctx) -> Result<(), Box<dyn std::error::Error>> {
    let Ctx {
        config,
        api,
        history,
        bindings,
        ..
    } = ctx;

    let messenger = HttpMessenger::new(&config.messenger)?;
    let scheduler = NotificationScheduler::new(
        Arc::new(api),
        Arc::new(history),
        Arc::new(bindings),
        Arc::new(messenger),
    );

    let count = scheduler.load_jobs()?;
    println!("wattbind scheduler running with {count} daily job(s); Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    println!("shutting down");
    Ok(())
}
