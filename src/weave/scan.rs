//! Discovery of injection targets in a module's type table.

use uuid::Uuid;

use crate::ir::{Module, TypeDef};
use crate::visit::Visitor;

/// A type whose marked constructor gets a synthesized factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorTarget {
    pub ty: String,
    pub ctor: Uuid,
}

/// A type whose marked fields get a synthesized injector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTarget {
    pub ty: String,
    /// Marked field names, in declaration order.
    pub fields: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub constructable: Vec<ConstructorTarget>,
    pub injectable: Vec<FieldTarget>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.constructable.is_empty() && self.injectable.is_empty()
    }
}

/// Classify every type of `module`. `registrar` names the synthetic registrar
/// type, which is never a target. Results follow type-table order.
pub fn scan(module: &Module, registrar: &str) -> ScanResult {
    let mut scanner = Scanner { registrar, result: ScanResult::default() };
    scanner.visit_module(module);
    scanner.result
}

struct Scanner<'a> {
    registrar: &'a str,
    result: ScanResult,
}

impl Visitor for Scanner<'_> {
    fn visit_type(&mut self, ty: &TypeDef) {
        if ty.is_interface() || ty.name == self.registrar {
            return;
        }

        let mut marked = ty.constructors.iter().filter(|c| c.is_injected());
        if let Some(first) = marked.next() {
            let ignored = marked.count();
            if ty.is_abstract {
                tracing::warn!(ty = %ty.name, "ignoring injection marker on constructor of abstract type");
            } else {
                if ignored > 0 {
                    tracing::warn!(ty = %ty.name, ignored, "several constructors are marked, using the first");
                }
                self.result.constructable.push(ConstructorTarget { ty: ty.name.clone(), ctor: first.id });
            }
        }

        for method in ty.methods.iter().filter(|m| m.is_injected()) {
            tracing::warn!(ty = %ty.name, method = %method.name, "injection marker on a method has no effect");
        }

        let fields: Vec<String> = ty.fields.iter()
            .filter(|f| f.is_injected())
            .map(|f| f.name.clone())
            .collect();
        if !fields.is_empty() {
            self.result.injectable.push(FieldTarget { ty: ty.name.clone(), fields });
        }
    }
}
