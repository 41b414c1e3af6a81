//! Binary-split broadcast with failure rerouting.
//!
//! Delivering an event to an open-ended target list without any single
//! node making a linear number of calls: the sender cuts the list in two,
//! hands each half to its first element, and every recipient repeats the
//! cut on its own continuation. Depth is O(log n) and each node contacts
//! at most two peers per event.
//!
//! Delivery is best-effort, at most once. A branch whose recipient fails
//! is rerouted *into* that branch (the continuation head becomes the new
//! recipient); once a branch's continuation is exhausted the branch is
//! dropped permanently, truncating its entire subtree. There is no retry
//! queue and no mesh-wide repair.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::event::Event;

/// Cut a target list into a binary broadcast map.
///
/// Each map entry is an immediate recipient and the continuation list it
/// becomes responsible for. Empty input yields no entries, a singleton
/// yields one recipient with an empty continuation, and any longer list
/// yields exactly two entries that together partition the input.
pub fn split(urls: &[String]) -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    match urls {
        [] => {}
        [only] => {
            map.insert(only.clone(), Vec::new());
        }
        _ => {
            let (first_half, second_half) = urls.split_at(urls.len() / 2);
            map.insert(first_half[0].clone(), first_half[1..].to_vec());
            map.insert(second_half[0].clone(), second_half[1..].to_vec());
        }
    }
    map
}

/// Outbound delivery of one event to one peer.
///
/// Implementations signal success only for an affirmative response;
/// transport failures and non-success statuses both count as delivery
/// failure and trigger the reroute policy.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    async fn deliver(&self, url: &str, event: &Event) -> Result<(), TransportError>;
}

/// Aggregate outcome of one propagation fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Branches whose event reached a recipient.
    pub delivered: usize,
    /// Reroute hops taken across all branches.
    pub rerouted: usize,
    /// Branches dropped after exhausting their continuation.
    pub dropped: usize,
}

/// Fans events out across the broadcast tree.
pub struct Propagator<T> {
    transport: Arc<T>,
}

impl<T: EventTransport> Propagator<T> {
    /// Create a propagator over the given transport.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Fan the event out and wait for every branch to settle.
    ///
    /// One task per immediate recipient; the whole group is awaited here
    /// so the outcome of every branch is observed and logged rather than
    /// leaked.
    pub async fn propagate(&self, event: Event) -> PropagationReport {
        let targets = split(&event.send_to);
        if targets.is_empty() {
            return PropagationReport::default();
        }

        let mut branches = JoinSet::new();
        for (recipient, continuation) in targets {
            let transport = Arc::clone(&self.transport);
            let mut branch_event = event.clone();
            branch_event.send_to = continuation;
            branches.spawn(deliver_branch(transport, recipient, branch_event));
        }

        let mut report = PropagationReport::default();
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok(outcome) => {
                    report.rerouted += outcome.reroutes;
                    if outcome.delivered {
                        report.delivered += 1;
                    } else {
                        report.dropped += 1;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "branch delivery task failed");
                    report.dropped += 1;
                }
            }
        }

        if report.dropped > 0 {
            warn!(
                event = event.name(),
                delivered = report.delivered,
                rerouted = report.rerouted,
                dropped = report.dropped,
                "propagation finished with dropped branches"
            );
        } else {
            debug!(
                event = event.name(),
                delivered = report.delivered,
                rerouted = report.rerouted,
                "propagation finished"
            );
        }
        report
    }

    /// Detach a propagation as background work.
    ///
    /// The call site does not wait; the returned handle makes "has this
    /// event finished propagating" queryable when a caller cares.
    pub fn spawn(self: &Arc<Self>, event: Event) -> JoinHandle<PropagationReport> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.propagate(event).await })
    }
}

/// Per-branch outcome.
#[derive(Debug, Clone, Copy)]
struct BranchOutcome {
    delivered: bool,
    reroutes: usize,
}

/// Walk one branch of the broadcast tree.
///
/// Iterative on purpose: a failure cascade walks the continuation list
/// one hop at a time, bounded by its length, instead of growing the call
/// stack.
async fn deliver_branch<T: EventTransport>(
    transport: Arc<T>,
    first: String,
    mut event: Event,
) -> BranchOutcome {
    let mut recipient = first;
    let mut reroutes = 0;
    loop {
        match transport.deliver(&recipient, &event).await {
            Ok(()) => {
                return BranchOutcome {
                    delivered: true,
                    reroutes,
                }
            }
            Err(err) if event.send_to.is_empty() => {
                warn!(
                    url = %recipient,
                    error = %err,
                    "continuation exhausted, dropping branch"
                );
                return BranchOutcome {
                    delivered: false,
                    reroutes,
                };
            }
            Err(err) => {
                let next = event.send_to.remove(0);
                warn!(
                    failed = %recipient,
                    retrying = %next,
                    error = %err,
                    "delivery failed, rerouting into branch"
                );
                recipient = next;
                reroutes += 1;
            }
        }
    }
}
