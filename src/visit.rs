//! Module visitor infrastructure
//!
//! `Visitor` walks a module's type table in declaration order: types, then
//! for each type its fields, constructors and methods, then every
//! instruction of each body.
//!
//! Implement the trait for your pass, overriding only the methods you need.
//! Call the corresponding `walk_*` function inside your override to keep the
//! default recursion, or omit it to prune traversal at that node.
//!
//! ```rust
//! use prewire::ir::{Instr, MethodDef, TypeDef};
//! use prewire::visit::Visitor;
//!
//! struct ResolveCounter {
//!     count: usize,
//! }
//!
//! impl Visitor for ResolveCounter {
//!     fn visit_instr(&mut self, _owner: &TypeDef, _method: &MethodDef, instr: &Instr) {
//!         if matches!(instr, Instr::Resolve { .. }) {
//!             self.count += 1;
//!         }
//!     }
//! }
//! ```

use crate::ir::{FieldDef, Instr, MethodDef, Module, TypeDef};

/// Read-only module visitor. Default implementations recurse into all children.
pub trait Visitor: Sized {
    fn visit_module(&mut self, module: &Module) {
        walk_module(self, module);
    }

    fn visit_type(&mut self, ty: &TypeDef) {
        walk_type(self, ty);
    }

    fn visit_field(&mut self, _owner: &TypeDef, _field: &FieldDef) {}

    fn visit_constructor(&mut self, owner: &TypeDef, ctor: &MethodDef) {
        walk_body(self, owner, ctor);
    }

    fn visit_method(&mut self, owner: &TypeDef, method: &MethodDef) {
        walk_body(self, owner, method);
    }

    fn visit_instr(&mut self, _owner: &TypeDef, _method: &MethodDef, _instr: &Instr) {}
}

pub fn walk_module<V: Visitor>(v: &mut V, module: &Module) {
    for ty in &module.types {
        v.visit_type(ty);
    }
}

pub fn walk_type<V: Visitor>(v: &mut V, ty: &TypeDef) {
    for field in &ty.fields {
        v.visit_field(ty, field);
    }
    for ctor in &ty.constructors {
        v.visit_constructor(ty, ctor);
    }
    for method in &ty.methods {
        v.visit_method(ty, method);
    }
}

pub fn walk_body<V: Visitor>(v: &mut V, owner: &TypeDef, method: &MethodDef) {
    for instr in &method.body {
        v.visit_instr(owner, method, instr);
    }
}
