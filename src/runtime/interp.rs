//! Stack interpreter for method bodies.
//!
//! One `Frame` per call. Member access is checked against the frame's
//! declaring type and module: private members are reachable only from their
//! declaring type, internal members and non-public types only from their
//! own module.

use std::rc::Rc;

use crate::ir::{CONSTRUCTOR_NAME, Const, Instr, MethodDef, Visibility};
use crate::runtime::error::RuntimeError;
use crate::runtime::value::{MethodHandle, Object, Value};
use crate::runtime::{Host, LoadedType};

struct Frame<'a> {
    host: &'a Rc<Host>,
    owner: &'a LoadedType,
    method: &'a MethodDef,
    args: Vec<Value>,
    stack: Vec<Value>,
}

pub(crate) fn execute(
    host: &Rc<Host>,
    owner: &LoadedType,
    method: &MethodDef,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let mut frame = Frame { host, owner, method, args, stack: Vec::new() };

    for instr in &method.body {
        match instr {
            Instr::LoadArg(n) => {
                let value = frame.args.get(usize::from(*n)).cloned()
                    .ok_or_else(|| frame.fault(format!("no argument {n}")))?;
                frame.stack.push(value);
            }
            Instr::LoadConst(c) => frame.stack.push(match c {
                Const::Null => Value::Null,
                Const::Bool(b) => Value::Bool(*b),
                Const::Int(n) => Value::Int(*n),
                Const::Str(s) => Value::str(s),
            }),
            Instr::LoadField { owner, field } => {
                let target = frame.lookup_type(owner)?;
                frame.check_field_access(&target, field)?;
                let object = frame.pop_object()?;
                let value = object.get_declared(owner, field)
                    .ok_or_else(|| frame.fault(format!("'{}' has no field {owner}::{field}", object.type_name())))?;
                frame.stack.push(value);
            }
            Instr::StoreField { owner, field } => {
                let target = frame.lookup_type(owner)?;
                frame.check_field_access(&target, field)?;
                let value = frame.pop()?;
                let object = frame.pop_object()?;
                if !object.set_declared(owner, field, value) {
                    return Err(frame.fault(format!("'{}' has no field {owner}::{field}", object.type_name())));
                }
            }
            Instr::NewObj { owner, ctor } => {
                let target = frame.lookup_type(owner)?;
                let def = Rc::clone(&target.def);
                let ctor_def = def.constructor(*ctor)
                    .ok_or_else(|| frame.fault(format!("'{owner}' has no constructor {ctor}")))?;
                frame.check_member_access(&target, ctor_def.visibility, CONSTRUCTOR_NAME)?;
                let args = frame.pop_n(ctor_def.params.len())?;
                let instance = frame.host.construct(owner, *ctor, args)?;
                frame.stack.push(instance);
            }
            Instr::Call { owner, method: id } => {
                let target = frame.lookup_type(owner)?;
                let def = Rc::clone(&target.def);
                let callee = def.member(*id)
                    .ok_or_else(|| frame.fault(format!("'{owner}' has no method {id}")))?;
                frame.check_member_access(&target, callee.visibility, &callee.name)?;
                let args = frame.pop_n(callee.arity())?;
                let result = frame.host.call(&target, callee, args)?;
                if callee.return_type.is_some() {
                    frame.stack.push(result.unwrap_or(Value::Null));
                }
            }
            Instr::LoadMethod { owner, method: id } => {
                let target = frame.lookup_type(owner)?;
                let callee = target.def.method(*id)
                    .ok_or_else(|| frame.fault(format!("'{owner}' has no method {id}")))?;
                if !callee.is_static {
                    return Err(frame.fault(format!("{owner}::{} is not static", callee.name)));
                }
                frame.check_member_access(&target, callee.visibility, &callee.name)?;
                frame.stack.push(Value::Method(MethodHandle { owner: owner.clone(), method: *id }));
            }
            Instr::Resolve { ty } => {
                let Value::Container(container) = frame.pop()? else {
                    return Err(frame.fault(format!("resolving '{ty}' needs a container")));
                };
                let value = container.resolve(ty)?;
                frame.stack.push(value);
            }
            Instr::Register { kind, ty } => {
                let Value::Method(handle) = frame.pop()? else {
                    return Err(frame.fault(format!("registering a {kind} for '{ty}' needs a method")));
                };
                frame.host.register_woven(*kind, ty, &handle)?;
            }
            Instr::Upcast { ty } => {
                let top = frame.stack.last().ok_or_else(|| frame.fault("stack underflow"))?;
                if !top.is_null() && !frame.host.is_instance_of(top, ty) {
                    return Err(frame.fault(format!("cannot upcast '{}' to '{ty}'", top.type_name())));
                }
            }
            Instr::Print => {
                let value = frame.pop()?;
                frame.host.write_output(value.to_string());
            }
            Instr::Dup => {
                let top = frame.stack.last().cloned().ok_or_else(|| frame.fault("stack underflow"))?;
                frame.stack.push(top);
            }
            Instr::Pop => {
                frame.pop()?;
            }
            Instr::Return => break,
        }
    }

    frame.finish()
}

impl Frame<'_> {
    fn fault(&self, msg: impl std::fmt::Display) -> RuntimeError {
        RuntimeError::execution(format!("{}::{}: {msg}", self.owner.def.name, self.method.name))
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| self.fault("stack underflow"))
    }

    /// Pop `n` values, returned in push order.
    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        if self.stack.len() < n {
            return Err(self.fault("stack underflow"));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn pop_object(&mut self) -> Result<Object, RuntimeError> {
        match self.pop()? {
            Value::Object(o) => Ok(o),
            other => Err(self.fault(format!("expected an object, found {}", other.type_name()))),
        }
    }

    fn finish(mut self) -> Result<Option<Value>, RuntimeError> {
        match self.method.return_type {
            Some(_) => Ok(Some(self.pop()?)),
            None => Ok(None),
        }
    }

    fn lookup_type(&self, name: &str) -> Result<LoadedType, RuntimeError> {
        let target = self.host.loaded_type(name)
            .ok_or_else(|| self.fault(format!("unknown type '{name}'")))?;
        if target.def.visibility != Visibility::Public && target.module != self.owner.module {
            return Err(self.fault(format!(
                "type '{name}' is not accessible from module '{}'",
                self.owner.module
            )));
        }
        Ok(target)
    }

    fn check_field_access(&self, target: &LoadedType, field: &str) -> Result<(), RuntimeError> {
        let def = target.def.field(field)
            .ok_or_else(|| self.fault(format!("'{}' declares no field '{field}'", target.def.name)))?;
        self.check_member_access(target, def.visibility, field)
    }

    fn check_member_access(&self, target: &LoadedType, visibility: Visibility, member: &str) -> Result<(), RuntimeError> {
        let allowed = match visibility {
            Visibility::Public => true,
            Visibility::Internal => target.module == self.owner.module,
            Visibility::Private => target.def.name == self.owner.def.name,
        };
        if allowed {
            Ok(())
        } else {
            Err(self.fault(format!("{:?} member {}::{member} is not accessible", visibility, target.def.name)))
        }
    }
}
