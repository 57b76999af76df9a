//! Registry fallback that builds entries from the host's live type tables.
//!
//! Used for modules that were never woven. It bypasses member visibility,
//! like any reflection-based injector would.

use std::rc::{Rc, Weak};

use crate::runtime::container::Container;
use crate::runtime::error::RuntimeError;
use crate::runtime::registry::{FactoryFn, Fallback, InjectorFn};
use crate::runtime::value::Value;
use crate::runtime::{Host, upgrade};

pub struct IntrospectionFallback {
    host: Weak<Host>,
}

impl IntrospectionFallback {
    pub fn new(host: Weak<Host>) -> Self {
        Self { host }
    }
}

impl Fallback for IntrospectionFallback {
    /// Constructs with the first constructor, in declaration order, whose
    /// parameters all resolve. A type without constructors is allocated with
    /// default field values.
    fn factory_for(&self, ty: &str) -> Option<FactoryFn> {
        let host = self.host.upgrade()?;
        let def = host.type_def(ty)?;
        if def.is_interface() || def.is_abstract {
            return None;
        }

        let weak = self.host.clone();
        let ty = ty.to_string();
        Some(Rc::new(move |container: &Container| {
            let host = upgrade(&weak)?;
            let def = host.type_def(&ty)
                .ok_or_else(|| RuntimeError::unsupported(&ty, "type is not loaded"))?;
            if def.constructors.is_empty() {
                return Ok(Value::Object(host.instantiate(&ty)?));
            }
            'ctors: for ctor in &def.constructors {
                let mut args = Vec::with_capacity(ctor.params.len());
                for param in &ctor.params {
                    match container.try_resolve(&param.ty)? {
                        Some(value) => args.push(value),
                        None => continue 'ctors,
                    }
                }
                tracing::trace!(ty = %ty, params = ctor.params.len(), "constructing through introspection");
                return host.construct(&ty, ctor.id, args);
            }
            Err(RuntimeError::unsupported(&ty, "no constructor has parameters that can all be resolved"))
        }))
    }

    fn injector_for(&self, ty: &str) -> Option<InjectorFn> {
        let host = self.host.upgrade()?;
        let def = host.type_def(ty)?;
        let fields: Vec<(String, String)> = def.fields.iter()
            .filter(|f| f.is_injected())
            .map(|f| (f.name.clone(), f.ty.clone()))
            .collect();
        if fields.is_empty() {
            return None;
        }

        let owner = ty.to_string();
        Some(Rc::new(move |instance: &Value, container: &Container| {
            let object = instance.as_object()
                .ok_or_else(|| RuntimeError::cast(&owner, instance.type_name()))?;
            for (name, field_ty) in &fields {
                let value = container.resolve(field_ty)?;
                if !object.set_declared(&owner, name, value) {
                    return Err(RuntimeError::execution(format!(
                        "'{}' has no field {owner}::{name}",
                        object.type_name()
                    )));
                }
            }
            Ok(())
        }))
    }
}
