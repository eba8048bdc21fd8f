//! Algorithm registry
//!
//! Descriptors are published only after their self-test passes:
//!
//! ```text
//! register(d)
//!   |-- driver already loaded? --> RegistrationConflict (nothing changes)
//!   |-- install d (not loaded) under an InstallGuard
//!   |-- run d.self_test
//!   |     ok  --> mark loaded, guard committed
//!   |     err --> guard drops, entry removed --> SelfTestFailure
//! ```
//!
//! Registration is serial: every mutating call takes `&mut self`.

use crate::config::GlueConfig;
use crate::descriptor::{AlgorithmDescriptor, AlgorithmSummary};
use crate::error::{GlueError, Result};
use crate::tfm::{Aead, Skcipher};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Debug)]
struct Entry {
    descriptor: Arc<AlgorithmDescriptor>,
    loaded: bool,
}

/// Removes a freshly installed entry on drop unless committed.
struct InstallGuard<'r> {
    entries: &'r mut Vec<Entry>,
    index: usize,
    committed: bool,
}

impl<'r> InstallGuard<'r> {
    fn install(entries: &'r mut Vec<Entry>, descriptor: AlgorithmDescriptor) -> Self {
        entries.push(Entry {
            descriptor: Arc::new(descriptor),
            loaded: false,
        });
        let index = entries.len() - 1;
        Self {
            entries,
            index,
            committed: false,
        }
    }

    fn descriptor(&self) -> Arc<AlgorithmDescriptor> {
        Arc::clone(&self.entries[self.index].descriptor)
    }

    fn commit(mut self) {
        self.entries[self.index].loaded = true;
        self.committed = true;
    }
}

impl Drop for InstallGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.entries.remove(self.index);
        }
    }
}

/// Table of registered algorithm implementations.
#[derive(Debug)]
pub struct Registry {
    config: GlueConfig,
    entries: Vec<Entry>,
}

impl Registry {
    /// Empty registry. Fails if `config` does not validate.
    pub fn new(config: GlueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            entries: Vec::new(),
        })
    }

    pub fn config(&self) -> &GlueConfig {
        &self.config
    }

    /// Self-test `descriptor` and publish it.
    ///
    /// # Errors
    ///
    /// - `RegistrationConflict` if the driver is already loaded
    /// - `SelfTestFailure` wrapping the first failing check; the registry is
    ///   left as it was
    #[instrument(skip_all, fields(driver = %descriptor.driver_name))]
    pub fn register(&mut self, descriptor: AlgorithmDescriptor) -> Result<()> {
        let driver = descriptor.driver_name.clone();
        if self.is_loaded(&driver) {
            error!(driver = %driver, "driver already registered");
            return Err(GlueError::RegistrationConflict { driver });
        }

        let priority = descriptor.priority;
        let guard = InstallGuard::install(&mut self.entries, descriptor);
        let outcome = guard.descriptor().run_self_test();

        match outcome {
            Ok(()) => {
                guard.commit();
                info!(driver = %driver, priority, "self-test OK -- registered");
                Ok(())
            }
            Err(source) => {
                drop(guard);
                error!(driver = %driver, error = %source, "self-test failed, not registered");
                Err(GlueError::SelfTestFailure {
                    driver,
                    source: Box::new(source),
                })
            }
        }
    }

    /// Remove a loaded driver. Returns whether anything was removed.
    pub fn unregister(&mut self, driver: &str) -> bool {
        match self
            .entries
            .iter()
            .position(|e| e.loaded && e.descriptor.driver_name == driver)
        {
            Some(index) => {
                self.entries.remove(index);
                info!(driver, "unregistered");
                true
            }
            None => false,
        }
    }

    /// Register every enabled algorithm in the order CBC, CFB, GCM, XTS.
    ///
    /// Stops at the first failure and returns it. Algorithms registered
    /// before the failure stay loaded.
    pub fn register_all(&mut self) -> Result<()> {
        let config = self.config.clone();

        #[cfg(feature = "cbc")]
        {
            if config.algorithms.cbc {
                self.register(crate::modes::cbc::descriptor(&config))?;
            }
        }
        #[cfg(feature = "cfb")]
        {
            if config.algorithms.cfb {
                self.register(crate::modes::cfb::descriptor(&config))?;
            }
        }
        #[cfg(feature = "gcm")]
        {
            if config.algorithms.gcm {
                self.register(crate::modes::gcm::descriptor(&config))?;
            }
        }
        #[cfg(feature = "xts")]
        {
            if config.algorithms.xts {
                self.register(crate::modes::xts::descriptor(&config))?;
            }
        }

        Ok(())
    }

    /// Unregister everything, most recent first.
    pub fn unregister_all(&mut self) {
        while let Some(entry) = self.entries.pop() {
            if entry.loaded {
                info!(driver = %entry.descriptor.driver_name, "unregistered");
            }
        }
    }

    pub fn is_loaded(&self, driver: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.loaded && e.descriptor.driver_name == driver)
    }

    /// Present in the table, loaded or not.
    pub fn is_installed(&self, driver: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.descriptor.driver_name == driver)
    }

    /// Highest-priority loaded entry whose logical or driver name is `name`.
    /// Ties go to the earliest registration.
    pub fn lookup(&self, name: &str) -> Option<Arc<AlgorithmDescriptor>> {
        self.entries
            .iter()
            .filter(|e| e.loaded)
            .filter(|e| e.descriptor.name == name || e.descriptor.driver_name == name)
            .rev()
            .max_by_key(|e| e.descriptor.priority)
            .map(|e| Arc::clone(&e.descriptor))
    }

    pub fn alloc_skcipher(&self, name: &str) -> Result<Box<dyn Skcipher>> {
        self.lookup(name)
            .ok_or_else(|| GlueError::NotAvailable(name.to_string()))?
            .instantiate_skcipher()
    }

    pub fn alloc_aead(&self, name: &str) -> Result<Box<dyn Aead>> {
        self.lookup(name)
            .ok_or_else(|| GlueError::NotAvailable(name.to_string()))?
            .instantiate_aead()
    }

    /// Loaded drivers in registration order.
    pub fn loaded(&self) -> Vec<AlgorithmSummary> {
        self.entries
            .iter()
            .filter(|e| e.loaded)
            .map(|e| e.descriptor.summary())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.loaded).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.unregister_all();
    }
}
