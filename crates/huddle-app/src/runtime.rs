//! Generic runtime for sync orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`SyncEngine`]: chat synchronization state machine
//! - [`CacheStore`]: the cache the engine keeps consistent
//! - [`Driver`]: Platform-specific I/O
//!
//! All inputs are serialized into one [`SyncEngine::handle`] call at a time.
//! After every call the cache's change feed is drained and fed back as
//! `CacheWritten` events before anything else is processed.

use std::{collections::VecDeque, time::Duration};

use huddle_client::{SyncAction, SyncConfig, SyncEngine, SyncEvent};
use huddle_core::{CacheStore, Environment};
use huddle_proto::InboundEvent;

use crate::{Driver, DriverEvent};

/// Pause between idle cycles.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one runtime cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Work was done; run the next cycle right away.
    Busy,
    /// Nothing arrived; the caller may sleep.
    Idle,
    /// The host asked to stop.
    Shutdown,
}

/// Generic runtime that orchestrates engine, cache and driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment supplying time
/// - `C`: Cache store
pub struct Runtime<D, E, C>
where
    D: Driver,
    E: Environment,
    C: CacheStore,
{
    driver: D,
    env: E,
    engine: SyncEngine<E>,
    cache: C,
    tick_interval: Duration,
}

impl<D, E, C> Runtime<D, E, C>
where
    D: Driver,
    E: Environment,
    C: CacheStore,
{
    /// Create a runtime with a disabled engine.
    pub fn new(driver: D, env: E, cache: C, config: SyncConfig) -> Self {
        let engine = SyncEngine::new(env.clone(), config);
        Self { driver, env, engine, cache, tick_interval: DEFAULT_TICK_INTERVAL }
    }

    /// Override the idle pause.
    #[must_use]
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Run the main event loop until the driver asks to stop.
    ///
    /// Synchronization is disabled on the way out so the channel is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters a rendering error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        loop {
            match self.step().await? {
                Step::Busy => {},
                Step::Idle => self.env.sleep(self.tick_interval).await,
                Step::Shutdown => break,
            }
        }

        self.dispatch(SyncEvent::Disable).await?;
        tracing::info!("runtime stopped");
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Polls host input, receives at most one frame, detects channel loss,
    /// then ticks the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters a rendering error.
    pub async fn step(&mut self) -> Result<Step, D::Error> {
        let mut busy = false;

        match self.driver.poll_event().await? {
            Some(DriverEvent::Shutdown) => return Ok(Step::Shutdown),
            Some(DriverEvent::Sync(event)) => {
                self.dispatch(event).await?;
                busy = true;
            },
            None => {},
        }

        if self.engine.is_connected() {
            if !self.driver.is_connected() {
                self.dispatch(SyncEvent::TransportClosed { reason: "channel closed".into() })
                    .await?;
                busy = true;
            } else if let Some(text) = self.driver.recv_frame().await {
                match InboundEvent::decode(&text) {
                    Ok(event) => self.dispatch(SyncEvent::Inbound(event)).await?,
                    Err(e) => tracing::warn!(error = %e, "dropping malformed frame"),
                }
                busy = true;
            }
        }

        self.dispatch(SyncEvent::Tick).await?;

        Ok(if busy { Step::Busy } else { Step::Idle })
    }

    /// Feed one event to the engine and execute everything it leads to.
    ///
    /// Follow-up events produced by executing actions (open results, fetched
    /// lists, cache writes) are processed before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters a rendering error.
    pub async fn dispatch(&mut self, event: SyncEvent) -> Result<(), D::Error> {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let actions = self.engine.handle(event, &mut self.cache);
            pending.extend(self.cache.take_writes().into_iter().map(SyncEvent::CacheWritten));

            for action in actions {
                if let Some(follow_up) = self.execute(action).await? {
                    pending.push_back(follow_up);
                }
            }
        }

        Ok(())
    }

    async fn execute(&mut self, action: SyncAction) -> Result<Option<SyncEvent>, D::Error> {
        match action {
            SyncAction::Open => match self.driver.open().await {
                Ok(()) => Ok(Some(SyncEvent::TransportOpened)),
                Err(e) => Ok(Some(SyncEvent::TransportFailed { reason: e.to_string() })),
            },
            SyncAction::Close => {
                self.driver.close();
                Ok(None)
            },
            SyncAction::Send(event) => {
                match event.encode() {
                    Ok(text) => {
                        if let Err(e) = self.driver.send_frame(text).await {
                            tracing::warn!(event = event.name(), error = %e, "failed to send frame");
                        }
                    },
                    Err(e) => tracing::warn!(event = event.name(), error = %e, "failed to encode"),
                }
                Ok(None)
            },
            SyncAction::FetchConversations { role } => {
                match self.driver.fetch_conversations(role).await {
                    Ok(conversations) => Ok(Some(SyncEvent::ConversationsFetched { role, conversations })),
                    Err(e) => {
                        tracing::warn!(%role, error = %e, "failed to fetch conversations");
                        Ok(None)
                    },
                }
            },
            SyncAction::ShowAlert(alert) => {
                self.driver.show_alert(alert)?;
                Ok(None)
            },
            SyncAction::Navigate(route) => {
                self.driver.navigate(route)?;
                Ok(None)
            },
        }
    }

    /// Get a reference to the engine.
    pub fn engine(&self) -> &SyncEngine<E> {
        &self.engine
    }

    /// Get a reference to the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Get a mutable reference to the cache.
    ///
    /// Writes made through it are picked up by the next dispatch.
    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    /// Get a reference to the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
