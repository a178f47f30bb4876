//! Tracked server registry and concurrent fan-out
//!
//! `ServerMonitor` is the collaborator-facing entry point: callers register
//! named servers, ask for probes, and read snapshots. Scheduling cadence stays
//! with the caller.

use crate::core::status::prober::{EndpointSlot, StatusProber};
use crate::core::status::types::{Endpoint, ProbeOutcome, StatusRecord};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// A server the caller asked to watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedServer {
    pub id: Uuid,
    pub name: String,
    pub endpoint: Endpoint,
}

#[derive(Default)]
struct Registry {
    servers: Vec<TrackedServer>,
    slots: HashMap<Endpoint, Arc<EndpointSlot>>,
}

/// Registry of tracked servers with one probe slot per distinct endpoint
pub struct ServerMonitor {
    prober: StatusProber,
    registry: Mutex<Registry>,
}

impl ServerMonitor {
    pub fn new(prober: StatusProber) -> Self {
        Self {
            prober,
            registry: Mutex::new(Registry::default()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(registry) => registry,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start tracking a server; servers sharing an endpoint share its slot
    pub fn track(&self, name: impl Into<String>, endpoint: Endpoint) -> Uuid {
        let server = TrackedServer {
            id: Uuid::new_v4(),
            name: name.into(),
            endpoint,
        };
        let id = server.id;

        let mut registry = self.registry();
        registry
            .slots
            .entry(server.endpoint.clone())
            .or_insert_with(|| Arc::new(EndpointSlot::new()));
        registry.servers.push(server);
        id
    }

    /// Stop tracking a server, dropping its slot once no server uses it
    pub fn untrack(&self, id: Uuid) -> Option<TrackedServer> {
        let mut registry = self.registry();
        let position = registry.servers.iter().position(|server| server.id == id)?;
        let removed = registry.servers.remove(position);

        if !registry.servers.iter().any(|server| server.endpoint == removed.endpoint) {
            registry.slots.remove(&removed.endpoint);
        }
        Some(removed)
    }

    pub fn servers(&self) -> Vec<TrackedServer> {
        self.registry().servers.clone()
    }

    /// Latest snapshot for a tracked endpoint
    pub fn snapshot(&self, endpoint: &Endpoint) -> Option<Arc<StatusRecord>> {
        self.registry().slots.get(endpoint).map(|slot| slot.snapshot())
    }

    fn slot(&self, endpoint: &Endpoint) -> Option<Arc<EndpointSlot>> {
        self.registry().slots.get(endpoint).cloned()
    }

    /// Probe one tracked endpoint; `None` if it is not tracked
    pub async fn probe(&self, endpoint: &Endpoint) -> Option<ProbeOutcome> {
        let slot = self.slot(endpoint)?;
        Some(self.prober.probe(endpoint, &slot).await)
    }

    /// Probe every distinct tracked endpoint concurrently
    ///
    /// Results arrive in completion order, one per tracked server.
    pub async fn probe_all(&self) -> Vec<(TrackedServer, ProbeOutcome)> {
        let (servers, slots): (Vec<TrackedServer>, Vec<(Endpoint, Arc<EndpointSlot>)>) = {
            let registry = self.registry();
            let slots = registry
                .slots
                .iter()
                .map(|(endpoint, slot)| (endpoint.clone(), Arc::clone(slot)))
                .collect();
            (registry.servers.clone(), slots)
        };

        let mut in_flight: FuturesUnordered<_> = slots
            .into_iter()
            .map(|(endpoint, slot)| async move {
                let outcome = self.prober.probe(&endpoint, &slot).await;
                (endpoint, outcome)
            })
            .collect();

        let mut reports = Vec::with_capacity(servers.len());
        while let Some((endpoint, outcome)) = in_flight.next().await {
            reports.extend(
                servers
                    .iter()
                    .filter(|server| server.endpoint == endpoint)
                    .map(|server| (server.clone(), outcome.clone())),
            );
        }
        reports
    }
}
