use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use crate::ir::{BOOL_TYPE, CONTAINER_TYPE, INT_TYPE, STRING_TYPE};
use crate::runtime::container::Container;

/// A runtime value as seen by IR code and by the container.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Object(Object),
    /// A static method captured as a callable.
    Method(MethodHandle),
    Container(Container),
}

/// Reference to a static method of a loaded type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    pub owner: String,
    pub method: Uuid,
}

/// A heap object. Clones share identity.
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

struct ObjectData {
    ty: String,
    /// Own fields first, then inherited ones up the supertype chain.
    fields: RefCell<Vec<FieldSlot>>,
}

struct FieldSlot {
    owner: String,
    name: String,
    value: Value,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Runtime type name, as used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => BOOL_TYPE,
            Value::Int(_) => INT_TYPE,
            Value::Str(_) => STRING_TYPE,
            Value::Object(o) => o.type_name(),
            Value::Method(_) => "method",
            Value::Container(_) => CONTAINER_TYPE,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Identity for objects and containers, equality for everything else.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Object::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => a == b,
            (Value::Container(a), Value::Container(b)) => Container::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Object(o) => write!(f, "<{}>", o.type_name()),
            Value::Method(h) => write!(f, "<method {}>", h.owner),
            Value::Container(_) => write!(f, "<container>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Object(o) => write!(f, "{o:?}"),
            other => write!(f, "{other}"),
        }
    }
}

impl Object {
    /// An object with no fields. Used by native factories for types that only
    /// exist on the Rust side.
    pub fn native(ty: impl Into<String>) -> Self {
        Self::with_fields(ty, Vec::new())
    }

    /// `fields` are `(declaring type, field name, initial value)`.
    pub(crate) fn with_fields(ty: impl Into<String>, fields: Vec<(String, String, Value)>) -> Self {
        let fields = fields.into_iter()
            .map(|(owner, name, value)| FieldSlot { owner, name, value })
            .collect();
        Object(Rc::new(ObjectData { ty: ty.into(), fields: RefCell::new(fields) }))
    }

    pub fn type_name(&self) -> &str {
        &self.0.ty
    }

    pub fn ptr_eq(a: &Object, b: &Object) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Most-derived field with this name.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.fields.borrow().iter()
            .find(|s| s.name == name)
            .map(|s| s.value.clone())
    }

    pub fn get_declared(&self, owner: &str, name: &str) -> Option<Value> {
        self.0.fields.borrow().iter()
            .find(|s| s.owner == owner && s.name == name)
            .map(|s| s.value.clone())
    }

    /// Store into the field `name` declared by `owner`. Returns false when the
    /// object has no such field.
    pub fn set_declared(&self, owner: &str, name: &str, value: Value) -> bool {
        let mut fields = self.0.fields.borrow_mut();
        match fields.iter_mut().find(|s| s.owner == owner && s.name == name) {
            Some(slot) => {
                slot.value = value;
                true
            }
            None => false,
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.0.fields.borrow().iter().map(|s| s.name.clone()).collect()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Field values are not printed: object graphs may be cyclic.
        f.debug_struct("Object")
            .field("ty", &self.0.ty)
            .field("fields", &self.field_names())
            .finish()
    }
}
