//! Best-effort observers of successful ballot casts.
//!
//! The notifier owns its observer list and lives in managed state; nothing
//! here may block or fail the request that triggered the notification.

/// Something that wants to hear about cast ballots.
pub trait VoteObserver: Send + Sync {
    fn vote_cast(&self, voter_name: &str, candidate_name: &str);
}

/// Writes an audit line for every cast ballot through the logging stack.
pub struct LogObserver;

impl VoteObserver for LogObserver {
    fn vote_cast(&self, voter_name: &str, candidate_name: &str) {
        info!(target: "votes", "Voter {voter_name} voted for candidate {candidate_name}");
    }
}

/// Dispatches vote notifications to all registered observers.
#[derive(Default)]
pub struct VoteNotifier {
    observers: Vec<Box<dyn VoteObserver>>,
}

impl VoteNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard observer set used by the server.
    pub fn with_default_observers() -> Self {
        let mut notifier = Self::new();
        notifier.register(LogObserver);
        notifier
    }

    pub fn register(&mut self, observer: impl VoteObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn notify_vote_cast(&self, voter_name: &str, candidate_name: &str) {
        for observer in &self.observers {
            observer.vote_cast(voter_name, candidate_name);
        }
    }
}
