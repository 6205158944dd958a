//! Interval sampling loops that record newly observed identities.
//!
//! Each loop owns its probe, its seen-set and its timeline. The timeline is
//! handed back through the task's `JoinHandle` once the stop signal has been
//! observed, so no other task ever touches it.

use std::collections::HashSet;
use std::hash::Hash;
use std::io;
use std::time::Duration;

use chrono::Utc;
use sysinfo::System;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::{netstat, snapshot};
use crate::core::dynamic_report::{ConnectionEvent, ProcessEvent};

/// A blocking source of (identity, event) observations.
pub trait Probe: Send + 'static {
    type Key: Eq + Hash + Send + 'static;
    type Event: Send + 'static;

    /// Take one sample. Errors are treated as transient.
    fn sample(&mut self) -> io::Result<Vec<(Self::Key, Self::Event)>>;
}

/// Samples the connection table; only sockets with a remote endpoint count.
pub struct NetworkProbe;

impl Probe for NetworkProbe {
    type Key = (std::net::SocketAddr, Option<std::net::SocketAddr>);
    type Event = ConnectionEvent;

    fn sample(&mut self) -> io::Result<Vec<(Self::Key, Self::Event)>> {
        let observed_at = Utc::now();
        Ok(netstat::list_connections()?
            .into_iter()
            .filter(|c| c.remote.is_some())
            .map(|connection| {
                (
                    connection.key(),
                    ConnectionEvent {
                        observed_at,
                        connection,
                    },
                )
            })
            .collect())
    }
}

/// Samples the process table, keyed by pid.
pub struct ProcessProbe {
    sys: System,
}

impl ProcessProbe {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for ProcessProbe {
    type Key = u32;
    type Event = ProcessEvent;

    fn sample(&mut self) -> io::Result<Vec<(Self::Key, Self::Event)>> {
        let observed_at = Utc::now();
        Ok(snapshot::list_processes(&mut self.sys)
            .into_iter()
            .map(|process| (process.pid, ProcessEvent { observed_at, process }))
            .collect())
    }
}

/// Spawn a sampling loop.
///
/// `seen` seeds the identities that must not be reported (the baseline). The
/// loop samples on every tick of `interval`, starting immediately, and exits
/// once `stop` turns true or its sender is dropped. A sample already in
/// flight when the signal arrives is completed and recorded.
pub fn spawn_sampler<P: Probe>(
    name: &'static str,
    mut probe: P,
    mut seen: HashSet<P::Key>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<Vec<P::Event>> {
    tokio::spawn(async move {
        let mut timeline: Vec<P::Event> = Vec::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                _ = ticker.tick() => {}
            }

            let joined = tokio::task::spawn_blocking(move || {
                let result = probe.sample();
                (probe, result)
            })
            .await;

            match joined {
                Ok((p, Ok(items))) => {
                    probe = p;
                    let before = timeline.len();
                    for (key, event) in items {
                        if seen.insert(key) {
                            timeline.push(event);
                        }
                    }
                    trace!(sampler = name, new = timeline.len() - before, "sample taken");
                }
                Ok((p, Err(e))) => {
                    probe = p;
                    debug!(sampler = name, error = %e, "sample failed; retrying next tick");
                }
                Err(e) => {
                    debug!(sampler = name, error = %e, "sampling task aborted");
                    break;
                }
            }
        }

        debug!(sampler = name, events = timeline.len(), "sampler stopped");
        timeline
    })
}
