//! Stock [`ConstructionRecipe`] implementations.
//!
//! Hosts with real injection-point discovery supply their own recipes;
//! these two cover the common cases of binding a ready-made value and
//! building from a closure.

use std::sync::Arc;

use wyre_common::{Instance, ProvisionFault};

use crate::recipe::{ConstructionRecipe, DependencyRequest, ResolvedSet};

/// Binds an existing value; no dependencies, construction just clones the
/// `Arc`.
pub struct InstanceRecipe {
    instance: Instance,
}

impl InstanceRecipe {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            instance: Arc::new(value),
        }
    }

    pub fn from_instance(instance: Instance) -> Self {
        Self { instance }
    }
}

impl ConstructionRecipe for InstanceRecipe {
    fn dependencies(&self) -> &[DependencyRequest] {
        &[]
    }

    fn construct(&self, _deps: &ResolvedSet) -> Result<Option<Instance>, ProvisionFault> {
        Ok(Some(self.instance.clone()))
    }
}

type ConstructFn =
    dyn Fn(&ResolvedSet) -> Result<Option<Instance>, ProvisionFault> + Send + Sync;
type InjectFn = dyn Fn(&Instance, &ResolvedSet) -> Result<(), ProvisionFault> + Send + Sync;

/// Builds instances from closures; covers dependency-taking recipes
/// without a host-side discovery layer.
pub struct FnRecipe {
    deps: Vec<DependencyRequest>,
    delegatable: bool,
    construct: Box<ConstructFn>,
    inject: Option<Box<InjectFn>>,
}

impl FnRecipe {
    pub fn new(
        deps: Vec<DependencyRequest>,
        construct: impl Fn(&ResolvedSet) -> Result<Option<Instance>, ProvisionFault>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            deps,
            delegatable: false,
            construct: Box::new(construct),
            inject: None,
        }
    }

    /// Convenience: a dependency-free recipe producing `value()` each time.
    pub fn producing<T, F>(value: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(Vec::new(), move |_| Ok(Some(Arc::new(value()))))
    }

    /// Attach a member-injection phase.
    pub fn with_inject(
        mut self,
        inject: impl Fn(&Instance, &ResolvedSet) -> Result<(), ProvisionFault>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.inject = Some(Box::new(inject));
        self
    }

    /// Mark instances of this recipe eligible as deferred-cycle targets.
    pub fn delegatable(mut self) -> Self {
        self.delegatable = true;
        self
    }
}

impl ConstructionRecipe for FnRecipe {
    fn dependencies(&self) -> &[DependencyRequest] {
        &self.deps
    }

    fn construct(&self, deps: &ResolvedSet) -> Result<Option<Instance>, ProvisionFault> {
        (self.construct)(deps)
    }

    fn inject(&self, instance: &Instance, deps: &ResolvedSet) -> Result<(), ProvisionFault> {
        match &self.inject {
            Some(inject) => inject(instance, deps),
            None => Ok(()),
        }
    }

    fn delegatable(&self) -> bool {
        self.delegatable
    }
}
