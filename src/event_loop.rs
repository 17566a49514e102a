//! Single-threaded dispatch loop
//!
//! The [`Compositor`] owns the [`Desktop`] and a calloop event loop. Backend
//! events arrive through an [`EventSender`] channel and are dispatched one at
//! a time. Other threads never touch the desktop; they hand closures to a
//! [`DeferredSender`] which the loop runs between events.

use anyhow::{Context, Result};
use calloop::channel::{self, Channel, Sender};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopSignal};
use log::{debug, info};
use std::time::Duration;

use crate::backend::headless::HeadlessBackend;
use crate::backend::BackendEvent;
use crate::desktop::Desktop;
use crate::error::{EngineError, EngineResult};

/// Frame interval used when an output reports no refresh rate
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// A call to run on the dispatch loop with the desktop borrowed
pub type Deferred = Box<dyn FnOnce(&mut Desktop) + Send>;

/// Cloneable, thread-safe handle for feeding backend events into the loop.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<BackendEvent>,
}

impl EventSender {
    pub fn send(&self, event: BackendEvent) -> EngineResult<()> {
        self.tx.send(event).map_err(|_| EngineError::LoopClosed)
    }
}

/// Cloneable, thread-safe handle for scheduling work on the loop.
#[derive(Clone)]
pub struct DeferredSender {
    tx: Sender<Deferred>,
}

impl DeferredSender {
    pub fn defer<F>(&self, call: F) -> EngineResult<()>
    where
        F: FnOnce(&mut Desktop) + Send + 'static,
    {
        self.tx.send(Box::new(call)).map_err(|_| EngineError::LoopClosed)
    }
}

pub struct Compositor {
    event_loop: EventLoop<'static, Desktop>,
    desktop: Desktop,
    events: EventSender,
    deferred: DeferredSender,
}

impl Compositor {
    pub fn new(desktop: Desktop) -> Result<Self> {
        let event_loop: EventLoop<Desktop> =
            EventLoop::try_new().context("Failed to create event loop")?;
        let handle = event_loop.handle();

        let (events_tx, events_rx): (Sender<BackendEvent>, Channel<BackendEvent>) = channel::channel();
        handle
            .insert_source(events_rx, |event, _, desktop: &mut Desktop| match event {
                channel::Event::Msg(event) => {
                    desktop.dispatch(&event);
                }
                channel::Event::Closed => debug!("Backend event channel closed"),
            })
            .map_err(|_| anyhow::anyhow!("register backend event channel"))?;

        let (deferred_tx, deferred_rx): (Sender<Deferred>, Channel<Deferred>) = channel::channel();
        handle
            .insert_source(deferred_rx, |event, _, desktop: &mut Desktop| {
                if let channel::Event::Msg(call) = event {
                    call(desktop);
                }
            })
            .map_err(|_| anyhow::anyhow!("register deferred call channel"))?;

        Ok(Self {
            event_loop,
            desktop,
            events: EventSender { tx: events_tx },
            deferred: DeferredSender { tx: deferred_tx },
        })
    }

    pub fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    pub fn deferred_sender(&self) -> DeferredSender {
        self.deferred.clone()
    }

    /// Stops [`Compositor::run`] from any thread.
    pub fn loop_signal(&self) -> LoopSignal {
        self.event_loop.get_signal()
    }

    pub fn desktop(&self) -> &Desktop {
        &self.desktop
    }

    pub fn desktop_mut(&mut self) -> &mut Desktop {
        &mut self.desktop
    }

    /// Announce the standard globals and `count` virtual outputs sized from
    /// the `[headless]` config section, then verify the required globals.
    pub fn start_headless(&mut self, backend: &HeadlessBackend, count: usize) -> Result<()> {
        for event in backend.announce_globals() {
            self.desktop.dispatch(&event);
        }
        self.desktop
            .check_required_globals()
            .context("Backend did not provide the required globals")?;

        let headless = self.desktop.config().headless.clone();
        let refresh_mhz = (headless.refresh_rate * 1000.0).round() as i32;
        for n in 1..=count {
            let event = backend.new_output(
                &format!("HEADLESS-{}", n),
                headless.width,
                headless.height,
                refresh_mhz,
            );
            self.desktop.dispatch(&event);
        }
        pump_headless(backend, &mut self.desktop);
        info!("🖥️ Started headless backend with {} output(s)", count);
        Ok(())
    }

    /// Pace the headless backend: each tick delivers its pending events and
    /// fires any scheduled frames.
    pub fn drive_headless(&mut self, backend: HeadlessBackend) -> Result<()> {
        let refresh = self.desktop.config().headless.refresh_rate;
        let interval = if refresh > 0.0 {
            Duration::from_secs_f64(1.0 / refresh)
        } else {
            DEFAULT_FRAME_INTERVAL
        };
        debug!("Headless frame interval {:?}", interval);

        self.event_loop
            .handle()
            .insert_source(Timer::immediate(), move |_, _, desktop: &mut Desktop| {
                pump_headless(&backend, desktop);
                TimeoutAction::ToDuration(interval)
            })
            .map_err(|_| anyhow::anyhow!("register headless frame timer"))?;
        Ok(())
    }

    /// Run one loop iteration, waiting at most `timeout` for events.
    pub fn dispatch(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.event_loop
            .dispatch(timeout, &mut self.desktop)
            .context("Event loop dispatch failed")
    }

    /// Dispatch until the loop signal is stopped.
    pub fn run(&mut self) -> Result<()> {
        info!("🎬 Entering dispatch loop");
        self.event_loop
            .run(None, &mut self.desktop, |_| {})
            .context("Event loop failed")?;
        info!("👋 Dispatch loop stopped");
        Ok(())
    }
}

/// Deliver everything the headless backend has queued. Returns how many
/// events were dispatched.
pub fn pump_headless(backend: &HeadlessBackend, desktop: &mut Desktop) -> usize {
    let mut delivered = 0;
    loop {
        let events = backend.take_events();
        if events.is_empty() {
            break;
        }
        for event in &events {
            desktop.dispatch(event);
        }
        delivered += events.len();
    }
    let frames = backend.frame_events();
    for event in &frames {
        desktop.dispatch(event);
    }
    delivered + frames.len()
}
