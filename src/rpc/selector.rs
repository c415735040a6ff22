//! Node selection

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::RegistrySettings;
use crate::error::{Error, Result};

use super::Node;

/// Picks the node a call to `service` is sent to
pub trait Selector: Send + Sync {
    fn select(&self, service: &str) -> Result<Node>;
}

#[derive(Debug, Default)]
struct ServicePool {
    nodes: Vec<Node>,
    next: AtomicUsize,
}

/// Round-robin over a fixed set of nodes per service
#[derive(Debug, Default)]
pub struct StaticSelector {
    services: HashMap<String, ServicePool>,
}

impl StaticSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[registry]` configuration section
    pub fn from_settings(settings: &RegistrySettings) -> Self {
        let mut selector = Self::new();
        for entry in &settings.nodes {
            selector.add(entry.service.clone(), Node::new(entry.id.clone(), entry.address.clone()));
        }
        selector
    }

    pub fn add(&mut self, service: impl Into<String>, node: Node) {
        self.services.entry(service.into()).or_default().nodes.push(node);
    }

    pub fn with_node(mut self, service: impl Into<String>, node: Node) -> Self {
        self.add(service, node);
        self
    }

    /// Nodes registered for `service`
    pub fn nodes(&self, service: &str) -> &[Node] {
        self.services
            .get(service)
            .map(|pool| pool.nodes.as_slice())
            .unwrap_or(&[])
    }
}

impl Selector for StaticSelector {
    fn select(&self, service: &str) -> Result<Node> {
        let pool = self
            .services
            .get(service)
            .filter(|pool| !pool.nodes.is_empty())
            .ok_or_else(|| Error::NoNode {
                service: service.to_string(),
            })?;

        let index = pool.next.fetch_add(1, Ordering::Relaxed) % pool.nodes.len();
        Ok(pool.nodes[index].clone())
    }
}
