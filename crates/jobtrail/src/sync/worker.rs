//! Background worker running a pass on a fixed interval or on demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};

use super::{SyncContext, SyncError};
use crate::email::MailSource;

/// Periodic sync worker.
///
/// Runs on its own thread with a current-thread runtime. Each wake-up
/// builds a fresh mail source from the factory, so a dropped connection
/// never outlives one pass.
pub struct SyncWorker {
    context: Arc<SyncContext>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    trigger: broadcast::Sender<()>,
}

impl SyncWorker {
    pub fn new(context: Arc<SyncContext>, interval: Duration) -> Self {
        let (trigger, _) = broadcast::channel(16);
        Self {
            shutdown: context.stop_handle(),
            context,
            interval,
            trigger,
        }
    }

    /// Starts the loop. The first pass runs immediately.
    pub fn start<F>(&self, make_source: F) -> std::io::Result<JoinHandle<()>>
    where
        F: Fn() -> Box<dyn MailSource> + Send + 'static,
    {
        let context = Arc::clone(&self.context);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;
        let mut trigger_rx = self.trigger.subscribe();

        std::thread::Builder::new()
            .name("jobtrail-sync".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("Cannot start sync runtime: {}", e);
                        return;
                    }
                };

                rt.block_on(async {
                    let mut interval_timer = tokio::time::interval(interval);
                    interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

                    loop {
                        if shutdown.load(Ordering::Acquire) {
                            break;
                        }

                        tokio::select! {
                            _ = interval_timer.tick() => {},
                            Ok(()) = trigger_rx.recv() => {
                                log::info!("Manual sync triggered");
                            },
                        }

                        if shutdown.load(Ordering::Acquire) {
                            break;
                        }

                        let mut source = make_source();
                        // Triggers accepted before this pass takes the gate are served by it.
                        while matches!(
                            trigger_rx.try_recv(),
                            Ok(()) | Err(TryRecvError::Lagged(_))
                        ) {}
                        match context.run_once(source.as_mut()).await {
                            Ok(report) if report.records_touched() > 0 => {
                                log::info!("Sync touched {} records", report.records_touched());
                            }
                            Ok(_) => {}
                            Err(e) => log::error!("Sync failed: {}", e),
                        }
                    }
                    log::info!("Sync worker stopped");
                });
            })
    }

    /// Requests a pass now. Rejected with [`SyncError::Busy`] while a pass
    /// is running; the request is not queued. A request accepted while the
    /// worker is already starting a pass is folded into that pass.
    pub fn trigger_now(&self) -> Result<(), SyncError> {
        if self.context.is_busy() {
            return Err(SyncError::Busy);
        }
        // No receiver means the worker is not running; nothing to wake.
        let _ = self.trigger.send(());
        Ok(())
    }

    /// Signals the loop and any running pass to stop. The pass finishes
    /// the message it is on.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.trigger.send(());
    }
}
