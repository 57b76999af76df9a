//! Binding store and resolution engine.
//!
//! Resolution looks up the nearest Binding along the requested type's
//! supertype chain, then produces an instance from, in priority order, the
//! Binding's fixed instance, its user factory, or the registry factory of its
//! concrete type. Only the earliest Binding declared for a type is ever
//! consulted; later ones are kept but stay dormant.
//!
//! Containers are single-threaded (`Rc`/`RefCell`). Sharing one across
//! threads requires external synchronization, and which thread's instance a
//! racing Singleton resolution caches is then unspecified.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::runtime::Host;
use crate::runtime::error::RuntimeError;
use crate::runtime::registry::FactoryFn;
use crate::runtime::value::Value;

/// Upper bound on the supertype chain walked when looking for a Binding.
pub const MAX_HIERARCHY_DEPTH: usize = 64;

/// Upper bound on nested resolutions. Each level runs a factory through the
/// interpreter, so this stays well inside a default thread stack.
pub const MAX_RESOLVE_DEPTH: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Unset,
    Transient,
    Singleton,
}

/// Shared handle to a container. Clones refer to the same bindings.
#[derive(Clone)]
pub struct Container {
    inner: Rc<ContainerInner>,
}

struct ContainerInner {
    host: Rc<Host>,
    bindings: RefCell<HashMap<String, Vec<Binding>>>,
    depth: Cell<usize>,
}

/// A rule for obtaining instances of a requested type. Returned by
/// [`Container::bind`] and configured through its builder methods.
#[derive(Clone)]
pub struct Binding {
    state: Rc<RefCell<BindingState>>,
}

struct BindingState {
    requested: String,
    concrete: String,
    /// Fixed instance, or the cached instance once a Singleton has resolved.
    instance: Option<Value>,
    factory: Option<FactoryFn>,
    scope: Scope,
    resolved: bool,
    /// Set while this Binding is producing an instance.
    producing: bool,
}

impl Binding {
    fn new(ty: &str) -> Self {
        Self {
            state: Rc::new(RefCell::new(BindingState {
                requested: ty.to_string(),
                concrete: ty.to_string(),
                instance: None,
                factory: None,
                scope: Scope::Unset,
                resolved: false,
                producing: false,
            })),
        }
    }

    /// Build instances of `concrete` through its registry factory.
    pub fn to(self, concrete: impl Into<String>) -> Self {
        self.state.borrow_mut().concrete = concrete.into();
        self
    }

    /// Always hand out `instance`. Implies Singleton scope.
    pub fn from_instance(self, instance: Value) -> Self {
        {
            let mut s = self.state.borrow_mut();
            s.instance = Some(instance);
            s.scope = Scope::Singleton;
        }
        self
    }

    pub fn from_factory(self, factory: impl Fn(&Container) -> Result<Value, RuntimeError> + 'static) -> Self {
        self.state.borrow_mut().factory = Some(Rc::new(factory));
        self
    }

    pub fn as_singleton(self) -> Self {
        self.state.borrow_mut().scope = Scope::Singleton;
        self
    }

    pub fn as_transient(self) -> Self {
        self.state.borrow_mut().scope = Scope::Transient;
        self
    }

    pub fn scope(&self) -> Scope {
        self.state.borrow().scope
    }

    pub fn is_resolved(&self) -> bool {
        self.state.borrow().resolved
    }

    pub fn requested_type(&self) -> String {
        self.state.borrow().requested.clone()
    }

    pub fn concrete_type(&self) -> String {
        self.state.borrow().concrete.clone()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("Binding")
            .field("requested", &s.requested)
            .field("concrete", &s.concrete)
            .field("scope", &s.scope)
            .field("has_instance", &s.instance.is_some())
            .field("has_factory", &s.factory.is_some())
            .field("resolved", &s.resolved)
            .finish()
    }
}

/// Decrements the resolution depth when a resolution finishes.
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Clears the producing flag of a Binding when its resolution finishes.
struct ProducingGuard<'a>(&'a Binding);

impl Drop for ProducingGuard<'_> {
    fn drop(&mut self) {
        self.0.state.borrow_mut().producing = false;
    }
}

impl Container {
    pub fn new(host: Rc<Host>) -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                host,
                bindings: RefCell::new(HashMap::new()),
                depth: Cell::new(0),
            }),
        }
    }

    pub fn host(&self) -> &Rc<Host> {
        &self.inner.host
    }

    pub fn ptr_eq(a: &Container, b: &Container) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Append a new Binding for `ty` (scope Unset, concrete type `ty`).
    pub fn bind(&self, ty: &str) -> Binding {
        let binding = Binding::new(ty);
        let mut bindings = self.inner.bindings.borrow_mut();
        let list = bindings.entry(ty.to_string()).or_default();
        if !list.is_empty() {
            tracing::warn!(ty, existing = list.len(), "type is already bound; the new binding will not be used");
        }
        list.push(binding.clone());
        binding
    }

    /// Number of Bindings declared for exactly `ty`, dormant ones included.
    pub fn bindings_for(&self, ty: &str) -> usize {
        self.inner.bindings.borrow().get(ty).map_or(0, Vec::len)
    }

    pub fn resolve(&self, ty: &str) -> Result<Value, RuntimeError> {
        let depth = &self.inner.depth;
        if depth.get() >= MAX_RESOLVE_DEPTH {
            return Err(RuntimeError::execution(format!(
                "resolution of '{ty}' nested more than {MAX_RESOLVE_DEPTH} levels"
            )));
        }
        depth.set(depth.get() + 1);
        let _guard = DepthGuard(depth);

        let binding = self.find_binding(ty)?;
        let host = &self.inner.host;

        let (instance, factory, concrete) = {
            let mut s = binding.state.borrow_mut();
            if s.resolved {
                let cached = s.instance.clone().unwrap_or(Value::Null);
                if !host.is_instance_of(&cached, ty) {
                    return Err(RuntimeError::cast(ty, cached.type_name()));
                }
                tracing::trace!(ty, "resolved cached singleton");
                return Ok(cached);
            }
            if s.producing {
                return Err(RuntimeError::execution(format!(
                    "dependency cycle: '{ty}' is required while its binding for '{}' is still being resolved",
                    s.requested
                )));
            }
            s.producing = true;
            (s.instance.clone(), s.factory.clone(), s.concrete.clone())
        };
        let _producing = ProducingGuard(&binding);

        let produced = match (instance, factory) {
            (Some(instance), _) => instance,
            (None, Some(factory)) => factory(self)?,
            (None, None) => {
                let factory = host.registry().get_factory(&concrete)?;
                factory(self)?
            }
        };

        if !host.is_instance_of(&produced, ty) {
            return Err(RuntimeError::cast(ty, produced.type_name()));
        }

        // Field injection targets the requested type, not the concrete one.
        if let Some(injector) = host.registry().get_injector(ty) {
            injector(&produced, self)?;
        }

        let mut s = binding.state.borrow_mut();
        match s.scope {
            Scope::Unset => return Err(RuntimeError::Configuration { ty: s.requested.clone() }),
            Scope::Singleton => {
                s.instance = Some(produced.clone());
                s.resolved = true;
            }
            Scope::Transient => {}
        }
        tracing::trace!(ty, concrete = %s.concrete, scope = ?s.scope, "resolved");
        Ok(produced)
    }

    /// Like [`Container::resolve`], but `NotFound` and `Cast` become `None`.
    pub fn try_resolve(&self, ty: &str) -> Result<Option<Value>, RuntimeError> {
        match self.resolve(ty) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_recoverable() => {
                tracing::trace!(ty, error = %e, "try_resolve declined");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run the injector registered for the runtime type of `instance`.
    /// Values without an injector are left alone.
    pub fn inject(&self, instance: &Value) -> Result<(), RuntimeError> {
        let Some(object) = instance.as_object() else {
            return Ok(());
        };
        match self.inner.host.registry().get_injector(object.type_name()) {
            Some(injector) => injector(instance, self),
            None => Ok(()),
        }
    }

    /// Like [`Container::inject`], but `NotFound` and `Cast` become `false`.
    pub fn try_inject(&self, instance: &Value) -> Result<bool, RuntimeError> {
        match self.inject(instance) {
            Ok(()) => Ok(true),
            Err(e) if e.is_recoverable() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// First Binding of the nearest type on the supertype chain of `ty` that has any.
    fn find_binding(&self, ty: &str) -> Result<Binding, RuntimeError> {
        let bindings = self.inner.bindings.borrow();
        let mut current = ty.to_string();
        for _ in 0..MAX_HIERARCHY_DEPTH {
            if let Some(first) = bindings.get(&current).and_then(|list| list.first()) {
                if current != ty {
                    tracing::trace!(ty, via = %current, "using binding of supertype");
                }
                return Ok(first.clone());
            }
            match self.inner.host.supertype_of(&current) {
                Some(parent) => current = parent,
                None => return Err(RuntimeError::not_found(ty)),
            }
        }
        tracing::warn!(ty, "supertype chain deeper than {MAX_HIERARCHY_DEPTH}, giving up");
        Err(RuntimeError::not_found(ty))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.inner.bindings.borrow();
        let mut types: Vec<&String> = bindings.keys().collect();
        types.sort();
        f.debug_struct("Container").field("bound", &types).finish()
    }
}
