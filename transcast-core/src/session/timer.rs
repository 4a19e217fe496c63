use std::future::Future;

use tokio::task::JoinHandle;
use tracing::trace;

/// Holds at most one spawned timer task. Arming aborts the previous task
/// and bumps the generation; a timer message is only honoured when its
/// generation is still the current one.
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: None,
            generation: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Spawns the future built for the new generation and returns that
    /// generation.
    pub fn arm<F, Fut>(&mut self, build: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.abort();
        self.generation += 1;
        self.handle = Some(tokio::spawn(build(self.generation)));
        trace!(timer = self.name, generation = self.generation, "timer armed");
        self.generation
    }

    /// Returns whether a timer was running.
    pub fn cancel(&mut self) -> bool {
        let was_live = self.abort();
        if was_live {
            trace!(timer = self.name, generation = self.generation, "timer cancelled");
        }
        was_live
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    /// Consumes a one-shot firing. Returns false for a stale message.
    pub fn fire(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.handle = None;
        true
    }

    fn abort(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.abort();
    }
}
