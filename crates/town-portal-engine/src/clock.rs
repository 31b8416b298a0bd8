//! Logical tick clock.
//!
//! The host drives time by calling [`TickClock::advance`] once per game
//! tick; async tasks suspend on it with [`TickClock::sleep`] instead of
//! wall-clock timers, so the engine runs at whatever rate the host ticks.

use tokio::sync::watch;

pub struct TickClock {
    tx: watch::Sender<u64>,
}

impl TickClock {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn now(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Move to the next tick and wake every waiter whose deadline passed.
    pub fn advance(&self) -> u64 {
        self.tx.send_modify(|tick| *tick += 1);
        self.now()
    }

    /// Suspend until the clock reaches `tick`.
    pub async fn wait_until(&self, tick: u64) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail while we're borrowed.
        let _ = rx.wait_for(|now| *now >= tick).await;
    }

    /// Suspend for `ticks` ticks. Zero returns immediately.
    pub async fn sleep(&self, ticks: u64) {
        if ticks == 0 {
            return;
        }
        self.wait_until(self.now() + ticks).await;
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[tokio::test]
    async fn sleep_wakes_on_deadline() {
        let clock = Rc::new(TickClock::new());
        let woke_at = Rc::new(Cell::new(None));
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (c, w) = (clock.clone(), woke_at.clone());
                tokio::task::spawn_local(async move {
                    c.sleep(3).await;
                    w.set(Some(c.now()));
                });
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                    clock.advance();
                    tokio::task::yield_now().await;
                }
            })
            .await;
        assert_eq!(woke_at.get(), Some(3));
    }

    #[tokio::test]
    async fn past_deadline_is_immediate() {
        let clock = TickClock::new();
        clock.advance();
        clock.advance();
        clock.wait_until(1).await;
        clock.sleep(0).await;
        assert_eq!(clock.now(), 2);
    }
}
