//! Synthesis of factory and injector methods.
//!
//! Both are emitted as public static members of the type they serve, written
//! directly in the stack IR so that the host can run them without inspecting
//! type tables.

use uuid::Uuid;

use crate::diagnostics::WeaveError;
use crate::ir::builder::MethodBuilder;
use crate::ir::{Annotation, CONTAINER_TYPE, Instr, Module, OBJECT_TYPE, TypeDef, Visibility};
use crate::weave::scan::{ConstructorTarget, FieldTarget};

/// Name of the synthesized factory: `(container) -> object`.
pub const FACTORY_METHOD: &str = "__prewire_create";

/// Name of the synthesized injector: `(instance, container) -> void`.
pub const INJECTOR_METHOD: &str = "__prewire_inject";

/// Tag carried by every member the weaver emits.
pub const GENERATED_TAG: &str = "prewire.generated";

/// A synthesized static method and the type it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesized {
    pub ty: String,
    pub method: Uuid,
}

pub fn generated_annotation() -> Annotation {
    Annotation::Custom(GENERATED_TAG.to_string())
}

/// Emit `__prewire_create` for `target`.
///
/// Constructor parameters are resolved strictly in declaration order, since
/// a resolution can construct a singleton as a side effect.
pub fn synthesize_factory(module: &mut Module, target: &ConstructorTarget) -> Result<Synthesized, WeaveError> {
    let ty = target_type(module, &target.ty)?;
    if ty.has_member_named(FACTORY_METHOD) {
        return Err(WeaveError::name_collision(&ty.name, FACTORY_METHOD));
    }

    let ctor = ty.constructors.iter_mut()
        .find(|c| c.id == target.ctor)
        .ok_or_else(|| WeaveError::invariant(format!(
            "selected constructor {} of '{}' is not in its constructor table",
            target.ctor, target.ty
        )))?;
    ctor.visibility = Visibility::Public;

    let mut body = Vec::with_capacity(ctor.params.len() * 2 + 3);
    for param in &ctor.params {
        body.push(Instr::LoadArg(0));
        body.push(Instr::Resolve { ty: param.ty.clone() });
    }
    body.push(Instr::NewObj { owner: target.ty.clone(), ctor: target.ctor });
    body.push(Instr::Upcast { ty: OBJECT_TYPE.to_string() });
    body.push(Instr::Return);

    let factory = MethodBuilder::static_method(FACTORY_METHOD)
        .public()
        .param("container", CONTAINER_TYPE)
        .returns(OBJECT_TYPE)
        .annotate(generated_annotation())
        .body(body)
        .build();
    let method = factory.id;
    tracing::debug!(ty = %target.ty, params = factory.body.len().saturating_sub(3) / 2, "synthesized factory");

    widen(ty);
    ty.methods.push(factory);
    Ok(Synthesized { ty: target.ty.clone(), method })
}

/// Emit `__prewire_inject` for `target`, assigning marked fields in
/// declaration order.
pub fn synthesize_injector(module: &mut Module, target: &FieldTarget) -> Result<Synthesized, WeaveError> {
    let ty = target_type(module, &target.ty)?;
    if ty.has_member_named(INJECTOR_METHOD) {
        return Err(WeaveError::name_collision(&ty.name, INJECTOR_METHOD));
    }

    let mut body = Vec::with_capacity(target.fields.len() * 4 + 1);
    for name in &target.fields {
        let field = ty.fields.iter_mut()
            .find(|f| &f.name == name)
            .ok_or_else(|| WeaveError::invariant(format!(
                "marked field '{name}' of '{}' is not in its field table",
                target.ty
            )))?;
        field.visibility = Visibility::Public;
        body.extend([
            Instr::LoadArg(0),
            Instr::LoadArg(1),
            Instr::Resolve { ty: field.ty.clone() },
            Instr::StoreField { owner: target.ty.clone(), field: name.clone() },
        ]);
    }
    body.push(Instr::Return);

    let injector = MethodBuilder::static_method(INJECTOR_METHOD)
        .public()
        .param("instance", target.ty.clone())
        .param("container", CONTAINER_TYPE)
        .annotate(generated_annotation())
        .body(body)
        .build();
    let method = injector.id;
    tracing::debug!(ty = %target.ty, fields = target.fields.len(), "synthesized injector");

    widen(ty);
    ty.methods.push(injector);
    Ok(Synthesized { ty: target.ty.clone(), method })
}

fn target_type<'m>(module: &'m mut Module, name: &str) -> Result<&'m mut TypeDef, WeaveError> {
    module.type_named_mut(name)
        .ok_or_else(|| WeaveError::invariant(format!("scanned type '{name}' is not in the type table")))
}

/// Make a touched type fully accessible so the registrar can reach its
/// synthesized members. Irreversible within the artifact.
fn widen(ty: &mut TypeDef) {
    if ty.visibility != Visibility::Public {
        tracing::debug!(ty = %ty.name, from = ?ty.visibility, "widening type visibility to public");
        ty.visibility = Visibility::Public;
    }
}
