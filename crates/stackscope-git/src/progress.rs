//! A gix progress sink that reports through `tracing`.
//!
//! Each task (`fetch`, `fetch.read pack`, `checkout.checkout`, ...) logs an
//! `info` event when it starts and one when it is dropped, carrying the final
//! count. Messages gix emits along the way are forwarded at the matching
//! level. Per-step counting only touches an atomic.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gix::progress::{Count, Id, MessageLevel, NestedProgress, Progress, Step, StepShared, Unit};
use tracing::{debug, info, warn};

pub struct TracingProgress {
    name: String,
    id: Id,
    max: Option<Step>,
    counter: StepShared,
}

impl TracingProgress {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(name.into(), gix::progress::UNKNOWN)
    }

    fn with_id(name: String, id: Id) -> Self {
        Self {
            name,
            id,
            max: None,
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn child_name(&self, name: impl Into<String>) -> String {
        let name = name.into();
        if name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{name}", self.name)
        }
    }
}

impl Drop for TracingProgress {
    fn drop(&mut self) {
        let step = self.step();
        if step > 0 {
            info!(task = %self.name, step, max = ?self.max, "clone progress");
        }
    }
}

impl Count for TracingProgress {
    fn set(&self, step: Step) {
        self.counter.store(step, Ordering::Relaxed);
    }

    fn step(&self) -> Step {
        self.counter.load(Ordering::Relaxed)
    }

    fn inc_by(&self, step: Step) {
        self.counter.fetch_add(step, Ordering::Relaxed);
    }

    fn counter(&self) -> StepShared {
        Arc::clone(&self.counter)
    }
}

impl Progress for TracingProgress {
    fn init(&mut self, max: Option<Step>, _unit: Option<Unit>) {
        self.max = max;
        self.counter.store(0, Ordering::Relaxed);
        info!(task = %self.name, max = ?max, "clone task started");
    }

    fn max(&self) -> Option<Step> {
        self.max
    }

    fn set_max(&mut self, max: Option<Step>) -> Option<Step> {
        std::mem::replace(&mut self.max, max)
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn id(&self) -> Id {
        self.id
    }

    fn message(&self, level: MessageLevel, message: String) {
        match level {
            MessageLevel::Failure => warn!(task = %self.name, "{message}"),
            MessageLevel::Success => info!(task = %self.name, "{message}"),
            MessageLevel::Info => debug!(task = %self.name, "{message}"),
        }
    }
}

impl NestedProgress for TracingProgress {
    type SubProgress = Self;

    fn add_child(&mut self, name: impl Into<String>) -> Self::SubProgress {
        Self::with_id(self.child_name(name), gix::progress::UNKNOWN)
    }

    fn add_child_with_id(&mut self, name: impl Into<String>, id: Id) -> Self::SubProgress {
        Self::with_id(self.child_name(name), id)
    }
}
