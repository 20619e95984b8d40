//! One-shot settlement signals
//!
//! The create flow submits a payment and wants to hand the caller a
//! confirmed packet when the gateway settles quickly. The webhook
//! handler fires the signal; the waiter gives up after a deadline and
//! leaves confirmation to the webhook alone.

use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::oneshot;

use shared::PayStatus;

#[derive(Default)]
pub struct PaySignals {
    waiters: DashMap<String, oneshot::Sender<PayStatus>>,
}

impl PaySignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in an order before submitting the payment,
    /// so a fast webhook cannot race past us
    pub fn register(&self, order_id: &str) -> oneshot::Receiver<PayStatus> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(order_id.to_string(), tx);
        rx
    }

    /// Fire-and-forget; nobody waiting is fine
    pub fn notify(&self, order_id: &str, status: PayStatus) {
        if let Some((_, tx)) = self.waiters.remove(order_id) {
            let _ = tx.send(status);
        }
    }

    pub fn forget(&self, order_id: &str) {
        self.waiters.remove(order_id);
    }

    /// Wait for settlement, bounded
    pub async fn wait(
        &self,
        order_id: &str,
        rx: oneshot::Receiver<PayStatus>,
        deadline: Duration,
    ) -> Option<PayStatus> {
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(status)) => Some(status),
            _ => {
                self.forget(order_id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_wakes_waiter() {
        let signals = PaySignals::new();
        let rx = signals.register("o1");
        signals.notify("o1", PayStatus::Success);
        let got = signals.wait("o1", rx, Duration::from_secs(1)).await;
        assert_eq!(got, Some(PayStatus::Success));
    }

    #[tokio::test]
    async fn wait_times_out_and_clears() {
        let signals = PaySignals::new();
        let rx = signals.register("o2");
        let got = signals.wait("o2", rx, Duration::from_millis(10)).await;
        assert_eq!(got, None);
        // A late webhook finds no waiter and does not panic
        signals.notify("o2", PayStatus::Failed);
    }
}
