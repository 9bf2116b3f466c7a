//! In-memory notification platform
//!
//! Keeps the table of active items that plays the role of platform ground
//! truth, and delivers lifecycle callbacks to the bound listener on a
//! dedicated thread, the way a notification subsystem calls a listener
//! service from its own binder thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, Weak};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};

use crate::application::ports::{ActiveItemSource, EnumerationError, LifecycleListener};
use crate::domain::aggregate::{ActiveItem, SourceId};
use crate::domain::listener::LifecycleEvent;

const CALLBACK_THREAD_NAME: &str = "platform-callbacks";

struct Dispatcher {
    events: Sender<LifecycleEvent>,
    thread: JoinHandle<()>,
}

/// Ground-truth table of active notifications with callback delivery
#[derive(Default)]
pub struct InMemoryPlatform {
    items: Mutex<Vec<ActiveItem>>,
    access_granted: AtomicBool,
    unavailable: AtomicBool,
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl InMemoryPlatform {
    /// Create an empty platform with listener access not yet granted
    pub fn new() -> Self {
        Self::default()
    }

    /// Start delivering callbacks to `listener` on the callback thread.
    ///
    /// Replaces any previously bound listener. If access is already granted
    /// the listener receives `Connected` first.
    pub fn bind_listener(&self, listener: Weak<dyn LifecycleListener>) -> io::Result<()> {
        self.unbind_listener();

        let (tx, rx) = mpsc::channel::<LifecycleEvent>();
        let thread = thread::Builder::new()
            .name(CALLBACK_THREAD_NAME.to_string())
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    let Some(listener) = listener.upgrade() else {
                        debug!("listener dropped, stopping callback delivery");
                        break;
                    };
                    listener.on_lifecycle_event(event);
                }
            })?;

        if self.is_access_granted() {
            let _ = tx.send(LifecycleEvent::Connected);
        }

        *self.dispatcher.lock().unwrap_or_else(|e| e.into_inner()) = Some(Dispatcher {
            events: tx,
            thread,
        });
        debug!("platform listener bound");
        Ok(())
    }

    /// Stop callback delivery and wait for pending callbacks to finish
    pub fn unbind_listener(&self) {
        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(Dispatcher { events, thread }) = dispatcher {
            drop(events);
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
            debug!("platform listener unbound");
        }
    }

    /// Whether a listener is bound
    pub fn has_listener(&self) -> bool {
        self.dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Deliver an event to the bound listener.
    ///
    /// Also used to replay duplicate or stale callbacks. Dropped silently when
    /// no listener is bound. If the callback thread has exited, the binding is
    /// released so `has_listener` reports false.
    pub fn emit(&self, event: LifecycleEvent) {
        let mut guard = self.dispatcher.lock().unwrap_or_else(|e| e.into_inner());
        let Some(dispatcher) = guard.as_ref() else {
            trace!(event = %event, "no listener bound, callback dropped");
            return;
        };

        trace!(event = %event, "dispatching platform callback");
        if let Err(mpsc::SendError(event)) = dispatcher.events.send(event) {
            warn!(event = %event, "callback thread exited, releasing listener binding");
            guard.take();
        }
    }

    /// Post a notification. An existing item with the same id is replaced.
    pub fn post(&self, source: SourceId, item_id: impl Into<String>) {
        let item = ActiveItem::new(source, item_id);
        {
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            items.retain(|existing| existing.item_id != item.item_id);
            items.push(item.clone());
        }
        self.emit(LifecycleEvent::Posted(item));
    }

    /// Dismiss a notification by id, returning it if it was active
    pub fn dismiss(&self, item_id: &str) -> Option<ActiveItem> {
        let removed = {
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            let index = items.iter().position(|item| item.item_id == item_id)?;
            items.remove(index)
        };
        self.emit(LifecycleEvent::Removed(removed.clone()));
        Some(removed)
    }

    /// Number of active items
    pub fn active_count(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Grant listener access and notify the listener
    pub fn grant_access(&self) {
        self.access_granted.store(true, Ordering::SeqCst);
        info!("listener access granted");
        self.emit(LifecycleEvent::Connected);
    }

    /// Revoke listener access and notify the listener
    pub fn revoke_access(&self) {
        self.access_granted.store(false, Ordering::SeqCst);
        info!("listener access revoked");
        self.emit(LifecycleEvent::Disconnected);
    }

    pub fn is_access_granted(&self) -> bool {
        self.access_granted.load(Ordering::SeqCst)
    }

    /// Make enumeration fail until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl ActiveItemSource for InMemoryPlatform {
    fn enumerate_active_items(&self) -> Result<Vec<ActiveItem>, EnumerationError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EnumerationError::Unavailable(
                "notification manager not responding".to_string(),
            ));
        }
        if !self.is_access_granted() {
            return Err(EnumerationError::AccessDenied);
        }
        Ok(self.items.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

impl Drop for InMemoryPlatform {
    fn drop(&mut self) {
        self.unbind_listener();
    }
}
