//! Click-to-select disambiguation
//!
//! A click on a node only selects it after a short delay. A drag starting
//! on the node within the delay cancels the pending selection; a second
//! click restarts it.

use std::time::Duration;

use crate::models::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingClick {
    node: NodeId,
    due: Duration,
}

/// Delayed node selection driven by caller-supplied timestamps
#[derive(Debug, Clone)]
pub struct ClickTimer {
    delay: Duration,
    pending: Option<PendingClick>,
}

impl ClickTimer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Register a click at `now`
    pub fn click(&mut self, node: NodeId, now: Duration) {
        self.pending = Some(PendingClick {
            node,
            due: now.saturating_add(self.delay),
        });
    }

    /// Drop the pending selection if it targets `node`
    pub fn cancel_for(&mut self, node: &NodeId) {
        if self.pending.as_ref().is_some_and(|p| &p.node == node) {
            self.pending = None;
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// When the pending selection becomes due
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// The node to select, once its delay has elapsed
    pub fn poll(&mut self, now: Duration) -> Option<NodeId> {
        match &self.pending {
            Some(pending) if now >= pending.due => self.pending.take().map(|p| p.node),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    #[test]
    fn test_selects_after_delay() {
        let mut timer = ClickTimer::new(ms(50));
        timer.click(id("a"), ms(1000));

        assert_eq!(timer.poll(ms(1049)), None);
        assert_eq!(timer.poll(ms(1050)), Some(id("a")));
        assert_eq!(timer.poll(ms(2000)), None);
    }

    #[test]
    fn test_second_click_restarts() {
        let mut timer = ClickTimer::new(ms(50));
        timer.click(id("a"), ms(0));
        timer.click(id("b"), ms(40));

        assert_eq!(timer.deadline(), Some(ms(90)));
        assert_eq!(timer.poll(ms(60)), None);
        assert_eq!(timer.poll(ms(90)), Some(id("b")));
    }

    #[test]
    fn test_drag_on_other_node_keeps_pending() {
        let mut timer = ClickTimer::new(ms(50));
        timer.click(id("a"), ms(0));
        timer.cancel_for(&id("b"));
        assert!(timer.deadline().is_some());
        timer.cancel_for(&id("a"));
        assert!(timer.deadline().is_none());
    }
}
