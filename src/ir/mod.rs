//! In-memory tree representation of a compiled module.
//!
//! A module is an ordered type table. Each type carries member tables
//! (fields, constructors, methods) and members carry annotations. Method
//! bodies are a flat stack IR (`Instr`). The weaver edits this tree in place
//! and the host runtime executes it.

pub mod builder;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root of every reference type; synthesized factories return this.
pub const OBJECT_TYPE: &str = "object";

/// Declared type of the container parameter on synthesized methods.
pub const CONTAINER_TYPE: &str = "Prewire.Container";

/// Name of the injection runtime support module.
pub const RUNTIME_MODULE: &str = "Prewire";

/// Built-in value types understood by the host.
pub const INT_TYPE: &str = "int";
pub const BOOL_TYPE: &str = "bool";
pub const STRING_TYPE: &str = "string";

/// Name given to constructors in the member tables.
pub const CONSTRUCTOR_NAME: &str = ".ctor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Private,
    Internal,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
}

/// Member annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Annotation {
    /// The injection marker. Only meaningful on constructors and fields.
    Inject,
    /// Run once when an editor/tooling host loads the module.
    EditorLoadHook,
    /// Run once when any host loads the module.
    RuntimeLoadHook,
    Custom(String),
}

impl Annotation {
    pub fn is_load_hook(&self) -> bool {
        matches!(self, Annotation::EditorLoadHook | Annotation::RuntimeLoadHook)
    }
}

/// A compiled unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    /// Names of the modules this one references, transitively.
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    /// Present once the module has been woven.
    #[serde(default)]
    pub stamp: Option<WeaveStamp>,
}

/// Marker left by the weaver on a rewritten module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaveStamp {
    pub tool_version: String,
    /// Hex SHA-256 of the module IR as it was before weaving.
    pub source_hash: String,
    pub factories: u32,
    pub injectors: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Fully qualified name, unique across every module a host loads.
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub supertype: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub constructors: Vec<MethodDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub ty: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

/// A method or constructor. Instance members receive `this` as argument 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub body: Vec<Instr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Const {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Which registry table a `Register` instruction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallableKind {
    Factory,
    Injector,
}

impl std::fmt::Display for CallableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallableKind::Factory => write!(f, "factory"),
            CallableKind::Injector => write!(f, "injector"),
        }
    }
}

/// Stack IR instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    /// Push argument `n`.
    LoadArg(u16),
    LoadConst(Const),
    /// Pop an object, push the value of its field.
    LoadField { owner: String, field: String },
    /// Pop a value then an object, store the value into the object's field.
    StoreField { owner: String, field: String },
    /// Pop the constructor's arguments, allocate, run the constructor, push the instance.
    NewObj { owner: String, ctor: Uuid },
    /// Pop the arguments (receiver first for instance methods), push the result if any.
    Call { owner: String, method: Uuid },
    /// Push a callable value referring to a static method.
    LoadMethod { owner: String, method: Uuid },
    /// Pop a container, push the instance it resolves for `ty`.
    Resolve { ty: String },
    /// Pop a callable and register it for `ty` in the host registry.
    Register { kind: CallableKind, ty: String },
    /// Reference conversion to a supertype. Checked, never changes the value.
    Upcast { ty: String },
    /// Pop a value and append its display form to the host output.
    Print,
    Dup,
    Pop,
    Return,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), references: Vec::new(), types: Vec::new(), stamp: None }
    }

    pub fn type_named(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn type_named_mut(&mut self, name: &str) -> Option<&mut TypeDef> {
        self.types.iter_mut().find(|t| t.name == name)
    }

    pub fn references_module(&self, name: &str) -> bool {
        self.references.iter().any(|r| r == name)
    }
}

impl TypeDef {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn constructor(&self, id: Uuid) -> Option<&MethodDef> {
        self.constructors.iter().find(|c| c.id == id)
    }

    pub fn method(&self, id: Uuid) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.id == id)
    }

    pub fn method_named(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Look a member up by id in either the constructor or the method table.
    pub fn member(&self, id: Uuid) -> Option<&MethodDef> {
        self.constructor(id).or_else(|| self.method(id))
    }

    pub fn has_member_named(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name) || self.fields.iter().any(|f| f.name == name)
    }
}

impl FieldDef {
    pub fn is_injected(&self) -> bool {
        self.annotations.contains(&Annotation::Inject)
    }
}

impl MethodDef {
    pub fn is_injected(&self) -> bool {
        self.annotations.contains(&Annotation::Inject)
    }

    pub fn has_annotation(&self, annotation: &Annotation) -> bool {
        self.annotations.contains(annotation)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// Number of stack arguments a call consumes, including `this`.
    pub fn arity(&self) -> usize {
        self.params.len() + usize::from(!self.is_static)
    }
}
