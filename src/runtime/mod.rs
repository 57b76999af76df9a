//! Host runtime: loads woven modules, runs their load hooks and executes
//! IR on behalf of the container.
//!
//! A `Host` owns the type universe of every module it loaded and the
//! [`Registry`] that their baking routines fill. Containers are created from
//! a host and share its registry; nothing here is global state.

pub mod container;
pub mod error;
pub mod fallback;
mod interp;
pub mod registry;
pub mod value;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use serde::Deserialize;
use uuid::Uuid;

use crate::binary::Artifact;
use crate::ir::{
    Annotation, BOOL_TYPE, CONTAINER_TYPE, CallableKind, INT_TYPE, MethodDef, Module, OBJECT_TYPE, STRING_TYPE, TypeDef,
    Visibility,
};

pub use container::{Binding, Container, Scope};
pub use error::RuntimeError;
pub use fallback::IntrospectionFallback;
pub use registry::{FactoryFn, Fallback, InjectorFn, Registry};
pub use value::{MethodHandle, Object, Value};

/// Upper bound on nested IR calls, sized for a 2 MiB thread stack in
/// unoptimized builds.
pub const MAX_CALL_DEPTH: usize = 96;

/// Which load hooks a host honours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
    /// Editor/tooling process: runs editor and runtime hooks.
    Editor,
    /// Deployed player: runs runtime hooks only.
    #[default]
    Player,
}

impl HostMode {
    pub fn runs(self, hook: &Annotation) -> bool {
        match hook {
            Annotation::RuntimeLoadHook => true,
            Annotation::EditorLoadHook => self == HostMode::Editor,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostConfig {
    pub mode: HostMode,
    /// Synthesize registry entries from live type tables when none was registered.
    pub introspection_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub module: String,
    pub types: usize,
    pub hooks_run: usize,
    /// Factories registered while loading this module.
    pub factories: usize,
    /// Injectors registered while loading this module.
    pub injectors: usize,
}

/// A type together with the module that declared it.
#[derive(Clone)]
pub(crate) struct LoadedType {
    pub(crate) module: Rc<str>,
    pub(crate) def: Rc<TypeDef>,
}

pub struct Host {
    config: HostConfig,
    modules: RefCell<Vec<String>>,
    types: RefCell<HashMap<String, LoadedType>>,
    registry: Registry,
    output: RefCell<Vec<String>>,
    call_depth: Cell<usize>,
}

struct CallGuard<'a>(&'a Cell<usize>);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl Host {
    pub fn new(config: HostConfig) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Host>| {
            let fallback: Option<Box<dyn Fallback>> = if config.introspection_fallback {
                Some(Box::new(IntrospectionFallback::new(weak.clone())))
            } else {
                None
            };
            Host {
                config,
                modules: RefCell::new(Vec::new()),
                types: RefCell::new(HashMap::new()),
                registry: Registry::new(fallback),
                output: RefCell::new(Vec::new()),
                call_depth: Cell::new(0),
            }
        })
    }

    pub fn config(&self) -> HostConfig {
        self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A fresh container backed by this host's registry.
    pub fn container(self: &Rc<Self>) -> Container {
        Container::new(Rc::clone(self))
    }

    pub fn load_artifact(self: &Rc<Self>, artifact: Artifact) -> Result<LoadReport, RuntimeError> {
        self.load(artifact.module)
    }

    /// Add the module's types to the type universe, then run each of its
    /// load hooks valid for this host's mode, once, before returning. A hook
    /// failure leaves the host in an unspecified state and should be treated
    /// as fatal.
    pub fn load(self: &Rc<Self>, module: Module) -> Result<LoadReport, RuntimeError> {
        let name = module.name.clone();
        if self.is_loaded(&name) {
            return Err(RuntimeError::load(&name, "module is already loaded"));
        }

        let mut hooks = Vec::new();
        {
            let types = self.types.borrow();
            let mut seen = HashSet::new();
            for ty in &module.types {
                if !seen.insert(ty.name.as_str()) || types.contains_key(&ty.name) {
                    return Err(RuntimeError::load(&name, format!("type '{}' is already defined", ty.name)));
                }
                for method in &ty.methods {
                    let Some(hook) = method.annotations.iter().find(|a| a.is_load_hook()) else {
                        continue;
                    };
                    if !method.is_static || !method.params.is_empty() {
                        return Err(RuntimeError::load(
                            &name,
                            format!("load hook {}::{} must be static and take no parameters", ty.name, method.name),
                        ));
                    }
                    if self.config.mode.runs(hook) {
                        hooks.push(MethodHandle { owner: ty.name.clone(), method: method.id });
                    } else {
                        tracing::debug!(module = %name, hook = ?hook, "load hook not run in this host mode");
                    }
                }
            }
        }

        let module_name: Rc<str> = Rc::from(name.as_str());
        let type_count = module.types.len();
        {
            let mut types = self.types.borrow_mut();
            for ty in module.types {
                let loaded = LoadedType { module: Rc::clone(&module_name), def: Rc::new(ty) };
                types.insert(loaded.def.name.clone(), loaded);
            }
        }
        self.modules.borrow_mut().push(name.clone());

        let (factories_before, injectors_before) = (self.registry.factory_count(), self.registry.injector_count());
        for hook in &hooks {
            tracing::debug!(module = %name, owner = %hook.owner, "running load hook");
            self.invoke_handle(hook, Vec::new())?;
        }

        let report = LoadReport {
            module: name,
            types: type_count,
            hooks_run: hooks.len(),
            factories: self.registry.factory_count() - factories_before,
            injectors: self.registry.injector_count() - injectors_before,
        };
        tracing::info!(
            module = %report.module,
            hooks = report.hooks_run,
            factories = report.factories,
            injectors = report.injectors,
            "loaded module"
        );
        Ok(report)
    }

    pub fn is_loaded(&self, module: &str) -> bool {
        self.modules.borrow().iter().any(|m| m == module)
    }

    pub fn loaded_modules(&self) -> Vec<String> {
        self.modules.borrow().clone()
    }

    pub fn type_def(&self, name: &str) -> Option<Rc<TypeDef>> {
        self.types.borrow().get(name).map(|t| Rc::clone(&t.def))
    }

    pub(crate) fn loaded_type(&self, name: &str) -> Option<LoadedType> {
        self.types.borrow().get(name).cloned()
    }

    /// Declared supertype of a loaded type.
    pub fn supertype_of(&self, name: &str) -> Option<String> {
        self.types.borrow().get(name).and_then(|t| t.def.supertype.clone())
    }

    /// Runtime type test. Objects conform to their type, its supertypes and
    /// every interface reachable from them; primitives only to themselves;
    /// null to nothing.
    pub fn is_instance_of(&self, value: &Value, ty: &str) -> bool {
        match value {
            Value::Null => false,
            _ if ty == OBJECT_TYPE => true,
            Value::Bool(_) => ty == BOOL_TYPE,
            Value::Int(_) => ty == INT_TYPE,
            Value::Str(_) => ty == STRING_TYPE,
            Value::Method(_) => false,
            Value::Container(_) => ty == CONTAINER_TYPE,
            Value::Object(o) => self.type_conforms(o.type_name(), ty),
        }
    }

    fn type_conforms(&self, actual: &str, target: &str) -> bool {
        let types = self.types.borrow();
        let mut pending = vec![actual.to_string()];
        let mut seen = HashSet::new();
        while let Some(name) = pending.pop() {
            if name == target {
                return true;
            }
            if let Some(t) = types.get(&name) {
                pending.extend(t.def.supertype.iter().cloned());
                pending.extend(t.def.interfaces.iter().cloned());
            }
            seen.insert(name);
            pending.retain(|n| !seen.contains(n));
        }
        false
    }

    /// Invoke a method by name with no access checks, as an entry point
    /// from outside any module.
    pub fn invoke(self: &Rc<Self>, owner: &str, method: &str, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        let target = self.loaded_type(owner)
            .ok_or_else(|| RuntimeError::execution(format!("unknown type '{owner}'")))?;
        let def = Rc::clone(&target.def);
        let callee = def.method_named(method)
            .ok_or_else(|| RuntimeError::execution(format!("'{owner}' has no method '{method}'")))?;
        self.call(&target, callee, args)
    }

    pub fn invoke_handle(self: &Rc<Self>, handle: &MethodHandle, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        let target = self.loaded_type(&handle.owner)
            .ok_or_else(|| RuntimeError::execution(format!("unknown type '{}'", handle.owner)))?;
        let def = Rc::clone(&target.def);
        let callee = def.member(handle.method)
            .ok_or_else(|| RuntimeError::execution(format!("'{}' has no member {}", handle.owner, handle.method)))?;
        self.call(&target, callee, args)
    }

    /// Allocate an instance of `ty` with default field values, without
    /// running any constructor.
    pub fn instantiate(&self, ty: &str) -> Result<Object, RuntimeError> {
        let mut slots = Vec::new();
        let mut current = Some(ty.to_string());
        let mut depth = 0;
        while let Some(name) = current {
            let Some(loaded) = self.loaded_type(&name) else {
                if name == ty {
                    return Err(RuntimeError::execution(format!("unknown type '{ty}'")));
                }
                break;
            };
            for field in &loaded.def.fields {
                slots.push((name.clone(), field.name.clone(), default_value(&field.ty)));
            }
            depth += 1;
            if depth > container::MAX_HIERARCHY_DEPTH {
                return Err(RuntimeError::execution(format!("supertype chain of '{ty}' is too deep")));
            }
            current = loaded.def.supertype.clone();
        }
        Ok(Object::with_fields(ty, slots))
    }

    /// Allocate `ty` and run the constructor `ctor` with `args`.
    pub fn construct(self: &Rc<Self>, ty: &str, ctor: Uuid, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let target = self.loaded_type(ty)
            .ok_or_else(|| RuntimeError::execution(format!("unknown type '{ty}'")))?;
        if target.def.is_abstract || target.def.is_interface() {
            return Err(RuntimeError::execution(format!("cannot instantiate abstract type '{ty}'")));
        }
        let def = Rc::clone(&target.def);
        let ctor_def = def.constructor(ctor)
            .ok_or_else(|| RuntimeError::execution(format!("'{ty}' has no constructor {ctor}")))?;

        let object = self.instantiate(ty)?;
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(Value::Object(object.clone()));
        full.extend(args);
        self.call(&target, ctor_def, full)?;
        Ok(Value::Object(object))
    }

    /// Drain the lines written by `Print`.
    pub fn take_output(&self) -> Vec<String> {
        std::mem::take(&mut *self.output.borrow_mut())
    }

    pub(crate) fn write_output(&self, line: String) {
        self.output.borrow_mut().push(line);
    }

    pub(crate) fn call(
        self: &Rc<Self>,
        owner: &LoadedType,
        method: &MethodDef,
        args: Vec<Value>,
    ) -> Result<Option<Value>, RuntimeError> {
        if args.len() != method.arity() {
            return Err(RuntimeError::execution(format!(
                "{}::{} expects {} argument(s), got {}",
                owner.def.name, method.name, method.arity(), args.len()
            )));
        }
        let depth = self.call_depth.get();
        if depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::execution(format!(
                "call depth exceeded {MAX_CALL_DEPTH} in {}::{}",
                owner.def.name, method.name
            )));
        }
        self.call_depth.set(depth + 1);
        let _guard = CallGuard(&self.call_depth);
        interp::execute(self, owner, method, args)
    }

    /// Wrap a synthesized static method into a registry callable. The
    /// registered type and the method must be public: the registry belongs
    /// to the injection runtime, outside the registering module.
    pub(crate) fn register_woven(
        self: &Rc<Self>,
        kind: CallableKind,
        ty: &str,
        handle: &MethodHandle,
    ) -> Result<(), RuntimeError> {
        let owner = self.loaded_type(&handle.owner)
            .ok_or_else(|| RuntimeError::execution(format!("unknown type '{}'", handle.owner)))?;
        let method = owner.def.method(handle.method)
            .ok_or_else(|| RuntimeError::execution(format!("'{}' has no method {}", handle.owner, handle.method)))?;
        let target = self.loaded_type(ty)
            .ok_or_else(|| RuntimeError::execution(format!("cannot register a {kind} for unknown type '{ty}'")))?;

        if target.def.visibility != Visibility::Public {
            return Err(RuntimeError::execution(format!(
                "type '{ty}' is not visible to the injection runtime; it must be public to register a {kind}"
            )));
        }
        if owner.def.visibility != Visibility::Public || method.visibility != Visibility::Public {
            return Err(RuntimeError::execution(format!(
                "{}::{} is not visible to the injection runtime",
                handle.owner, method.name
            )));
        }
        let expected = match kind {
            CallableKind::Factory => 1,
            CallableKind::Injector => 2,
        };
        if !method.is_static || method.params.len() != expected {
            return Err(RuntimeError::execution(format!(
                "{}::{} does not have the shape of a {kind}",
                handle.owner, method.name
            )));
        }

        let weak = Rc::downgrade(self);
        let handle = handle.clone();
        match kind {
            CallableKind::Factory => self.registry.register_factory(ty, Rc::new(move |c: &Container| {
                let host = upgrade(&weak)?;
                host.invoke_handle(&handle, vec![Value::Container(c.clone())])?
                    .ok_or_else(|| RuntimeError::execution(format!("factory on '{}' returned no value", handle.owner)))
            })),
            CallableKind::Injector => self.registry.register_injector(ty, Rc::new(move |instance: &Value, c: &Container| {
                let host = upgrade(&weak)?;
                host.invoke_handle(&handle, vec![instance.clone(), Value::Container(c.clone())])?;
                Ok(())
            })),
        }
    }
}

pub(crate) fn upgrade(weak: &Weak<Host>) -> Result<Rc<Host>, RuntimeError> {
    weak.upgrade().ok_or_else(|| RuntimeError::execution("host has been dropped"))
}

fn default_value(ty: &str) -> Value {
    match ty {
        INT_TYPE => Value::Int(0),
        BOOL_TYPE => Value::Bool(false),
        _ => Value::Null,
    }
}
