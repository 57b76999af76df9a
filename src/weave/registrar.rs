//! Emission of the registrar type and its baking routine.

use crate::diagnostics::WeaveError;
use crate::ir::builder::{MethodBuilder, TypeBuilder};
use crate::ir::{Annotation, CallableKind, Instr, Module};
use crate::weave::synth::{Synthesized, generated_annotation};

/// Name of the baking routine on the registrar type.
pub const BAKE_METHOD: &str = "Bake";

pub fn registrar_type_name(module: &str, simple_name: &str) -> String {
    format!("{module}.{simple_name}")
}

/// Host load marker for a module of the given classification.
pub fn load_hook(editor_only: bool) -> Annotation {
    if editor_only { Annotation::EditorLoadHook } else { Annotation::RuntimeLoadHook }
}

/// Append the registrar type to `module`. Its single static method registers
/// every factory, then every injector, in discovery order.
pub fn emit_registrar(
    module: &mut Module,
    type_name: &str,
    factories: &[Synthesized],
    injectors: &[Synthesized],
    editor_only: bool,
) -> Result<(), WeaveError> {
    if module.type_named(type_name).is_some() {
        return Err(WeaveError::name_collision(type_name, type_name));
    }

    let mut body = Vec::with_capacity((factories.len() + injectors.len()) * 2 + 1);
    let tables = [(CallableKind::Factory, factories), (CallableKind::Injector, injectors)];
    for (kind, entries) in tables {
        for entry in entries {
            body.push(Instr::LoadMethod { owner: entry.ty.clone(), method: entry.method });
            body.push(Instr::Register { kind, ty: entry.ty.clone() });
        }
    }
    body.push(Instr::Return);

    let bake = MethodBuilder::static_method(BAKE_METHOD)
        .public()
        .annotate(load_hook(editor_only))
        .annotate(generated_annotation())
        .body(body)
        .build();

    module.types.push(
        TypeBuilder::class(type_name)
            .public()
            .abstract_class()
            .method(bake)
            .build(),
    );
    tracing::debug!(
        registrar = type_name,
        factories = factories.len(),
        injectors = injectors.len(),
        editor_only,
        "emitted registrar"
    );
    Ok(())
}
