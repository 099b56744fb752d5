use std::sync::mpsc;

/// Fan-out of change notifications to any number of channel subscribers.
/// Subscribers that dropped their receiver are pruned on the next send.
pub struct Notifier<T> {
    senders: Vec<mpsc::Sender<T>>,
}

impl<T: Clone> Notifier<T> {
    pub fn new() -> Self {
        Notifier { senders: Vec::new() }
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    pub fn notify(&mut self, event: T) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

impl<T: Clone> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}
