//! Fluent constructors for IR trees.
//!
//! Used by the weaver to emit synthetic members and by tests and the
//! `assemble` command to describe modules without a front-end compiler.

use uuid::Uuid;

use super::*;

pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { module: Module::new(name) }
    }

    pub fn reference(mut self, name: impl Into<String>) -> Self {
        self.module.references.push(name.into());
        self
    }

    /// Reference the injection runtime module.
    pub fn references_runtime(self) -> Self {
        self.reference(RUNTIME_MODULE)
    }

    pub fn ty(mut self, ty: TypeDef) -> Self {
        self.module.types.push(ty);
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}

pub struct TypeBuilder {
    ty: TypeDef,
}

impl TypeBuilder {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            ty: TypeDef {
                id: Uuid::new_v4(),
                name: name.into(),
                visibility: Visibility::Private,
                kind: TypeKind::Class,
                is_abstract: false,
                supertype: None,
                interfaces: Vec::new(),
                fields: Vec::new(),
                constructors: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        let mut b = Self::class(name);
        b.ty.kind = TypeKind::Interface;
        b.ty.is_abstract = true;
        b.ty.visibility = Visibility::Public;
        b
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.ty.visibility = visibility;
        self
    }

    pub fn public(self) -> Self {
        self.visibility(Visibility::Public)
    }

    pub fn internal(self) -> Self {
        self.visibility(Visibility::Internal)
    }

    pub fn abstract_class(mut self) -> Self {
        self.ty.is_abstract = true;
        self
    }

    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.ty.supertype = Some(supertype.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.ty.interfaces.push(interface.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.ty.fields.push(field);
        self
    }

    /// Shorthand for a private field carrying the injection marker.
    pub fn inject_field(self, name: &str, ty: &str) -> Self {
        self.field(FieldBuilder::new(name, ty).inject().build())
    }

    pub fn constructor(mut self, ctor: MethodDef) -> Self {
        self.ty.constructors.push(ctor);
        self
    }

    pub fn method(mut self, method: MethodDef) -> Self {
        self.ty.methods.push(method);
        self
    }

    pub fn build(self) -> TypeDef {
        self.ty
    }
}

pub struct FieldBuilder {
    field: FieldDef,
}

impl FieldBuilder {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            field: FieldDef {
                id: Uuid::new_v4(),
                name: name.into(),
                ty: ty.into(),
                visibility: Visibility::Private,
                annotations: Vec::new(),
            },
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.field.visibility = visibility;
        self
    }

    pub fn inject(mut self) -> Self {
        self.field.annotations.push(Annotation::Inject);
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.field.annotations.push(annotation);
        self
    }

    pub fn build(self) -> FieldDef {
        self.field
    }
}

pub struct MethodBuilder {
    method: MethodDef,
}

impl MethodBuilder {
    fn blank(name: String, is_static: bool) -> Self {
        Self {
            method: MethodDef {
                id: Uuid::new_v4(),
                name,
                visibility: Visibility::Private,
                is_static,
                params: Vec::new(),
                return_type: None,
                annotations: Vec::new(),
                body: Vec::new(),
            },
        }
    }

    pub fn constructor() -> Self {
        Self::blank(CONSTRUCTOR_NAME.to_string(), false)
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::blank(name.into(), false)
    }

    pub fn static_method(name: impl Into<String>) -> Self {
        Self::blank(name.into(), true)
    }

    /// A constructor that stores each parameter into the field of the same name
    /// on `owner`, in parameter order.
    pub fn assigning_constructor(owner: &str, params: &[(&str, &str)]) -> Self {
        let mut b = Self::constructor();
        for (i, (name, ty)) in params.iter().enumerate() {
            b = b.param(*name, *ty);
            b.method.body.extend([
                Instr::LoadArg(0),
                Instr::LoadArg(i as u16 + 1),
                Instr::StoreField { owner: owner.to_string(), field: name.to_string() },
            ]);
        }
        b.method.body.push(Instr::Return);
        b
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.method.visibility = visibility;
        self
    }

    pub fn public(self) -> Self {
        self.visibility(Visibility::Public)
    }

    pub fn param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.method.params.push(Param { name: name.into(), ty: ty.into() });
        self
    }

    pub fn returns(mut self, ty: impl Into<String>) -> Self {
        self.method.return_type = Some(ty.into());
        self
    }

    pub fn inject(self) -> Self {
        self.annotate(Annotation::Inject)
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.method.annotations.push(annotation);
        self
    }

    pub fn instr(mut self, instr: Instr) -> Self {
        self.method.body.push(instr);
        self
    }

    pub fn body(mut self, body: Vec<Instr>) -> Self {
        self.method.body = body;
        self
    }

    pub fn build(self) -> MethodDef {
        self.method
    }
}
