//! Static handler registry.
//!
//! Maps every compiled-in [`Operation`] (HTTP method + route template) to a
//! [`HandlerDescriptor`] carrying the markers declared for it in the config
//! file, at method level and at group level. Built once at startup and
//! shared read-only through an `Arc`; lookups never take a lock.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::config::model::Config;

/// Declarative flag attached to a handler or a handler group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum Marker {
    /// Reachable without being rejected by the capability gate.
    OpenAccess,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAccess => f.write_str("open-access"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId {
    pub group: &'static str,
    pub operation: &'static str,
}

impl HandlerId {
    #[must_use]
    pub const fn new(group: &'static str, operation: &'static str) -> Self {
        Self { group, operation }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.operation)
    }
}

/// Precedence level at which a marker was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLevel {
    Method,
    Group,
}

impl fmt::Display for MarkerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method => f.write_str("method"),
            Self::Group => f.write_str("group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    id: HandlerId,
    method_markers: BTreeSet<Marker>,
    group_markers: BTreeSet<Marker>,
}

impl HandlerDescriptor {
    #[must_use]
    pub const fn new(id: HandlerId) -> Self {
        Self {
            id,
            method_markers: BTreeSet::new(),
            group_markers: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_method_marker(mut self, marker: Marker) -> Self {
        self.method_markers.insert(marker);
        self
    }

    #[must_use]
    pub fn with_group_marker(mut self, marker: Marker) -> Self {
        self.group_markers.insert(marker);
        self
    }

    #[must_use]
    pub const fn id(&self) -> HandlerId {
        self.id
    }

    #[must_use]
    pub fn has_method_marker(&self, marker: Marker) -> bool {
        self.method_markers.contains(&marker)
    }

    #[must_use]
    pub fn has_group_marker(&self, marker: Marker) -> bool {
        self.group_markers.contains(&marker)
    }
}

/// A compiled-in route: which handler answers which method and path template.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: HandlerId,
    pub method: Method,
    pub path: &'static str,
}

impl Operation {
    #[must_use]
    pub fn new(id: HandlerId, method: Method, path: &'static str) -> Self {
        Self { id, method, path }
    }
}

#[derive(Debug, Default)]
pub struct HandlerRegistry {
    routes: HashMap<Method, HashMap<&'static str, HandlerDescriptor>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build descriptors for `operations` from the markers declared in `config`.
    ///
    /// Operations whose group or operation entry is missing from the config
    /// get no markers at that level, so the gate rejects them.
    #[must_use]
    pub fn from_config(config: &Config, operations: &[Operation]) -> Self {
        let mut registry = Self::new();
        for op in operations {
            let mut descriptor = HandlerDescriptor::new(op.id);
            if let Some(group) = config.group(op.id.group) {
                for marker in &group.markers {
                    descriptor = descriptor.with_group_marker(*marker);
                }
                if let Some(declared) = group.operation(op.id.operation) {
                    for marker in &declared.markers {
                        descriptor = descriptor.with_method_marker(*marker);
                    }
                }
            }
            registry.register(op, descriptor);
        }
        registry
    }

    pub fn register(&mut self, operation: &Operation, descriptor: HandlerDescriptor) {
        self.routes
            .entry(operation.method.clone())
            .or_default()
            .insert(operation.path, descriptor);
    }

    /// Look up the descriptor for a method and a matched route template.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Option<&HandlerDescriptor> {
        self.routes.get(method)?.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{GroupConfig, OperationConfig};

    const REGISTER: HandlerId = HandlerId::new("user", "register");
    const REMOVE: HandlerId = HandlerId::new("user", "remove");
    const ECHO: HandlerId = HandlerId::new("open", "echo");

    fn operations() -> Vec<Operation> {
        vec![
            Operation::new(REGISTER, Method::POST, "/api/user"),
            Operation::new(REMOVE, Method::DELETE, "/api/user/{id}"),
            Operation::new(ECHO, Method::POST, "/open-api/echo"),
        ]
    }

    fn config() -> Config {
        Config {
            gate: Default::default(),
            capture: Default::default(),
            advice: Default::default(),
            groups: vec![
                GroupConfig {
                    id: "user".into(),
                    markers: vec![],
                    operations: vec![
                        OperationConfig {
                            id: "register".into(),
                            markers: vec![Marker::OpenAccess],
                        },
                        OperationConfig {
                            id: "remove".into(),
                            markers: vec![],
                        },
                    ],
                },
                GroupConfig {
                    id: "open".into(),
                    markers: vec![Marker::OpenAccess],
                    operations: vec![],
                },
            ],
        }
    }

    #[test]
    fn markers_land_on_their_level() {
        let registry = HandlerRegistry::from_config(&config(), &operations());
        assert_eq!(registry.len(), 3);

        let register = registry.resolve(&Method::POST, "/api/user").unwrap();
        assert!(register.has_method_marker(Marker::OpenAccess));
        assert!(!register.has_group_marker(Marker::OpenAccess));

        let echo = registry.resolve(&Method::POST, "/open-api/echo").unwrap();
        assert!(!echo.has_method_marker(Marker::OpenAccess));
        assert!(echo.has_group_marker(Marker::OpenAccess));

        let remove = registry.resolve(&Method::DELETE, "/api/user/{id}").unwrap();
        assert!(!remove.has_method_marker(Marker::OpenAccess));
        assert!(!remove.has_group_marker(Marker::OpenAccess));
    }

    #[test]
    fn resolve_is_keyed_by_method() {
        let registry = HandlerRegistry::from_config(&config(), &operations());
        assert!(registry.resolve(&Method::GET, "/api/user").is_none());
        assert!(registry.resolve(&Method::POST, "/api/user/{id}").is_none());
    }

    #[test]
    fn undeclared_group_has_no_markers() {
        let mut cfg = config();
        cfg.groups.retain(|g| g.id != "open");
        let registry = HandlerRegistry::from_config(&cfg, &operations());
        let echo = registry.resolve(&Method::POST, "/open-api/echo").unwrap();
        assert_eq!(echo, &HandlerDescriptor::new(ECHO));
    }

    #[test]
    fn handler_id_display() {
        assert_eq!(REGISTER.to_string(), "user.register");
        assert_eq!(MarkerLevel::Group.to_string(), "group");
    }
}
