//! Type-keyed table of factory and injector callables.
//!
//! Woven modules fill it from their baking routine when the host loads them;
//! native code may register entries directly. Entries are never replaced.
//! The only later mutation is the lazy caching of fallback entries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ir::CallableKind;
use crate::runtime::container::Container;
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;

/// Builds an instance, resolving its dependencies through the container.
pub type FactoryFn = Rc<dyn Fn(&Container) -> Result<Value, RuntimeError>>;

/// Assigns the injectable fields of an existing instance.
pub type InjectorFn = Rc<dyn Fn(&Value, &Container) -> Result<(), RuntimeError>>;

/// Source of entries for types that were never registered.
pub trait Fallback {
    fn factory_for(&self, ty: &str) -> Option<FactoryFn>;
    fn injector_for(&self, ty: &str) -> Option<InjectorFn>;
}

pub struct Registry {
    factories: RefCell<HashMap<String, FactoryFn>>,
    injectors: RefCell<HashMap<String, InjectorFn>>,
    fallback: Option<Box<dyn Fallback>>,
    fallback_factories: RefCell<HashMap<String, FactoryFn>>,
    fallback_injectors: RefCell<HashMap<String, InjectorFn>>,
}

impl Registry {
    pub fn new(fallback: Option<Box<dyn Fallback>>) -> Self {
        Self {
            factories: RefCell::new(HashMap::new()),
            injectors: RefCell::new(HashMap::new()),
            fallback,
            fallback_factories: RefCell::new(HashMap::new()),
            fallback_injectors: RefCell::new(HashMap::new()),
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn register_factory(&self, ty: &str, factory: FactoryFn) -> Result<(), RuntimeError> {
        let mut factories = self.factories.borrow_mut();
        if factories.contains_key(ty) {
            return Err(RuntimeError::DuplicateRegistration { ty: ty.to_string(), kind: CallableKind::Factory });
        }
        tracing::debug!(ty, "registered factory");
        factories.insert(ty.to_string(), factory);
        Ok(())
    }

    pub fn register_injector(&self, ty: &str, injector: InjectorFn) -> Result<(), RuntimeError> {
        let mut injectors = self.injectors.borrow_mut();
        if injectors.contains_key(ty) {
            return Err(RuntimeError::DuplicateRegistration { ty: ty.to_string(), kind: CallableKind::Injector });
        }
        tracing::debug!(ty, "registered injector");
        injectors.insert(ty.to_string(), injector);
        Ok(())
    }

    /// Registered factory for `ty`, else a cached or freshly synthesized
    /// fallback factory. Without a fallback a missing entry is `Unsupported`.
    pub fn get_factory(&self, ty: &str) -> Result<FactoryFn, RuntimeError> {
        if let Some(f) = self.factories.borrow().get(ty) {
            return Ok(f.clone());
        }
        let Some(fallback) = &self.fallback else {
            return Err(RuntimeError::unsupported(ty, "no factory registered; was its module woven?"));
        };
        if let Some(f) = self.fallback_factories.borrow().get(ty) {
            return Ok(f.clone());
        }
        let f = fallback.factory_for(ty)
            .ok_or_else(|| RuntimeError::unsupported(ty, "no factory registered and the type cannot be introspected"))?;
        tracing::debug!(ty, "cached fallback factory");
        self.fallback_factories.borrow_mut().insert(ty.to_string(), f.clone());
        Ok(f)
    }

    /// Registered injector for `ty`, else a fallback injector if one applies.
    /// Field injection is optional, so absence is not an error.
    pub fn get_injector(&self, ty: &str) -> Option<InjectorFn> {
        if let Some(f) = self.injectors.borrow().get(ty) {
            return Some(f.clone());
        }
        let fallback = self.fallback.as_ref()?;
        if let Some(f) = self.fallback_injectors.borrow().get(ty) {
            return Some(f.clone());
        }
        let f = fallback.injector_for(ty)?;
        tracing::debug!(ty, "cached fallback injector");
        self.fallback_injectors.borrow_mut().insert(ty.to_string(), f.clone());
        Some(f)
    }

    pub fn factory_count(&self) -> usize {
        self.factories.borrow().len()
    }

    pub fn injector_count(&self) -> usize {
        self.injectors.borrow().len()
    }

    pub fn cached_fallback_count(&self) -> usize {
        self.fallback_factories.borrow().len() + self.fallback_injectors.borrow().len()
    }

    /// Types with a registered factory, sorted.
    pub fn registered_factories(&self) -> Vec<String> {
        sorted_keys(&self.factories.borrow())
    }

    /// Types with a registered injector, sorted.
    pub fn registered_injectors(&self) -> Vec<String> {
        sorted_keys(&self.injectors.borrow())
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}
