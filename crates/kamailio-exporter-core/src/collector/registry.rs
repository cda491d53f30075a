//! Collector registry: the known collector kinds and the enabled instances.
//!
//! Each kind goes `Registered -> Instantiated` at most once, at startup. The
//! instantiated table is read-only afterwards and shared by every poll cycle.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::info;

use super::{BUILTIN_COLLECTORS, Collector, CollectorConfig};

pub type CollectorFactory = fn(&CollectorConfig) -> Box<dyn Collector>;

/// A collector kind that can be enabled by name.
#[derive(Clone, Copy)]
pub struct CollectorDescriptor {
    pub name: &'static str,
    pub default_enabled: bool,
    pub factory: CollectorFactory,
}

impl CollectorDescriptor {
    pub const fn new(name: &'static str, default_enabled: bool, factory: CollectorFactory) -> Self {
        Self {
            name,
            default_enabled,
            factory,
        }
    }
}

impl fmt::Debug for CollectorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorDescriptor")
            .field("name", &self.name)
            .field("default_enabled", &self.default_enabled)
            .finish()
    }
}

/// A live collector together with the name it reports under.
pub struct InstantiatedCollector {
    pub name: &'static str,
    pub collector: Box<dyn Collector>,
}

/// Which collectors to run: the defaults, plus `enable`, minus `disable`.
#[derive(Debug, Clone, Default)]
pub struct CollectorSelection {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    UnknownCollector(String),
    DuplicateCollector(&'static str),
    AlreadyInstantiated,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownCollector(name) => write!(f, "unknown collector: {}", name),
            RegistryError::DuplicateCollector(name) => {
                write!(f, "collector registered twice: {}", name)
            }
            RegistryError::AlreadyInstantiated => write!(f, "collectors already instantiated"),
        }
    }
}

impl std::error::Error for RegistryError {}

pub struct Registry {
    descriptors: Vec<CollectorDescriptor>,
    instantiated: OnceLock<Arc<[InstantiatedCollector]>>,
}

impl Registry {
    /// Registry holding every built-in collector kind.
    pub fn builtin() -> Self {
        Self {
            descriptors: BUILTIN_COLLECTORS.to_vec(),
            instantiated: OnceLock::new(),
        }
    }

    pub fn new(descriptors: Vec<CollectorDescriptor>) -> Result<Self, RegistryError> {
        for (i, d) in descriptors.iter().enumerate() {
            if descriptors[..i].iter().any(|other| other.name == d.name) {
                return Err(RegistryError::DuplicateCollector(d.name));
            }
        }
        Ok(Self {
            descriptors,
            instantiated: OnceLock::new(),
        })
    }

    pub fn descriptors(&self) -> &[CollectorDescriptor] {
        &self.descriptors
    }

    /// Names selected by `selection`, in registration order.
    pub fn enabled_names(
        &self,
        selection: &CollectorSelection,
    ) -> Result<Vec<&'static str>, RegistryError> {
        for name in selection.enable.iter().chain(&selection.disable) {
            if !self.descriptors.iter().any(|d| d.name == name) {
                return Err(RegistryError::UnknownCollector(name.clone()));
            }
        }

        Ok(self
            .descriptors
            .iter()
            .filter(|d| {
                let enabled = d.default_enabled || selection.enable.iter().any(|n| n == d.name);
                enabled && !selection.disable.iter().any(|n| n == d.name)
            })
            .map(|d| d.name)
            .collect())
    }

    /// Builds the enabled collectors. Succeeds once per registry.
    pub fn instantiate(
        &self,
        selection: &CollectorSelection,
        config: &CollectorConfig,
    ) -> Result<Arc<[InstantiatedCollector]>, RegistryError> {
        let names = self.enabled_names(selection)?;

        let mut created = false;
        let table = self.instantiated.get_or_init(|| {
            created = true;
            self.descriptors
                .iter()
                .filter(|d| names.contains(&d.name))
                .map(|d| InstantiatedCollector {
                    name: d.name,
                    collector: (d.factory)(config),
                })
                .collect::<Vec<_>>()
                .into()
        });
        if !created {
            return Err(RegistryError::AlreadyInstantiated);
        }

        info!(count = names.len(), collectors = ?names, "collectors enabled");
        Ok(Arc::clone(table))
    }

    /// The instantiated table, if [`Registry::instantiate`] has run.
    pub fn instantiated(&self) -> Option<Arc<[InstantiatedCollector]>> {
        self.instantiated.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectError, Rpc};
    use crate::metrics::MetricSink;

    struct Noop;

    impl Collector for Noop {
        fn update(&self, _rpc: &mut dyn Rpc, _sink: &mut MetricSink) -> Result<(), CollectError> {
            Ok(())
        }
    }

    fn noop(_: &CollectorConfig) -> Box<dyn Collector> {
        Box::new(Noop)
    }

    fn registry() -> Registry {
        Registry::new(vec![
            CollectorDescriptor::new("a", true, noop),
            CollectorDescriptor::new("b", false, noop),
            CollectorDescriptor::new("c", true, noop),
        ])
        .unwrap()
    }

    #[test]
    fn defaults_only() {
        let names = registry().enabled_names(&CollectorSelection::default()).unwrap();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn enable_and_disable() {
        let selection = CollectorSelection {
            enable: vec!["b".into()],
            disable: vec!["a".into()],
        };
        assert_eq!(registry().enabled_names(&selection).unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let selection = CollectorSelection {
            enable: vec!["nope".into()],
            disable: Vec::new(),
        };
        assert_eq!(
            registry().enabled_names(&selection).unwrap_err(),
            RegistryError::UnknownCollector("nope".into())
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = Registry::new(vec![
            CollectorDescriptor::new("a", true, noop),
            CollectorDescriptor::new("a", false, noop),
        ])
        .err()
        .unwrap();
        assert_eq!(err, RegistryError::DuplicateCollector("a"));
    }

    #[test]
    fn instantiation_happens_once() {
        let registry = registry();
        assert!(registry.instantiated().is_none());

        let table = registry
            .instantiate(&CollectorSelection::default(), &CollectorConfig::default())
            .unwrap();
        let names: Vec<_> = table.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(registry.instantiated().unwrap().len(), 2);

        let again = registry.instantiate(&CollectorSelection::default(), &CollectorConfig::default());
        assert!(matches!(again, Err(RegistryError::AlreadyInstantiated)));
    }

    #[test]
    fn builtin_registry_enables_everything_by_default() {
        let registry = Registry::builtin();
        let names = registry.enabled_names(&CollectorSelection::default()).unwrap();
        assert_eq!(names.len(), BUILTIN_COLLECTORS.len());
        assert!(names.contains(&"stats.fetch"));
        assert!(names.contains(&"dispatcher.list"));
    }
}
