//! The stack machine: dispatch loop, value stack, call frames, and the
//! three global tables (spec §3 "Invariants", §4.4).
//!
//! `Vm::run` owns the [`Chunk`] for the whole execution, matching the
//! single-actor model of spec §5 — the compiler is done with it by the
//! time a `Vm` exists.

use std::collections::HashMap;
use std::rc::Rc;

use gen_core::{Chunk, EnumData, GenError, ObjectData, OpCode, Value};

use crate::output::Output;

/// Value stack and call-frame stack are both capped at 256 entries (spec §5).
const MAX_STACK: usize = 256;
const MAX_FRAMES: usize = 256;

/// A call's return address and its local identifier table (spec §3).
/// `NEW_OBJ`/`OBJ_END` reuse this same frame shape for object-template
/// bodies (spec §4.4) — the locals table just goes unused there.
struct Frame {
    return_ip: usize,
    locals: HashMap<String, Value>,
}

/// State mid-way through an `ENUM_DEF ... ENUM_END` run. Enum bodies are
/// not skipped like function/object bodies: they execute immediately,
/// because there is no opcode that ever "enters" an enum later (§9's
/// skip-and-enter model applies only to `CALL`/`NEW_OBJ`). See DESIGN.md.
struct EnumBuild {
    name: String,
    members: HashMap<String, i64>,
    next_ordinal: i64,
}

pub struct Vm<'out> {
    chunk: Chunk,
    ip: usize,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    variables: HashMap<String, Value>,
    functions: HashMap<String, usize>,
    object_templates: HashMap<String, usize>,
    building_enum: Option<EnumBuild>,
    output: &'out mut dyn Output,
}

impl<'out> Vm<'out> {
    pub fn new(chunk: Chunk, output: &'out mut dyn Output) -> Self {
        Vm {
            chunk,
            ip: 0,
            stack: Vec::new(),
            frames: Vec::new(),
            variables: HashMap::new(),
            functions: HashMap::new(),
            object_templates: HashMap::new(),
            building_enum: None,
            output,
        }
    }

    /// Runs until `RETURN` empties the call stack or the instruction
    /// pointer leaves the buffer. Returns on the first runtime error.
    pub fn run(&mut self) -> Result<(), GenError> {
        while self.ip < self.chunk.code.len() {
            let op_ip = self.ip;
            let byte = self.chunk.code[op_ip];
            let Ok(op) = OpCode::try_from(byte) else {
                return Err(self.rt_err(op_ip, format!("invalid opcode byte {byte}")));
            };

            if self.dispatch(op, op_ip)? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Executes one opcode. Returns `Ok(true)` when `RETURN` just emptied
    /// the call stack (program halt).
    fn dispatch(&mut self, op: OpCode, op_ip: usize) -> Result<bool, GenError> {
        match op {
            OpCode::LoadConst => {
                let index = self.chunk.read_u16(op_ip + 1);
                let value = self
                    .chunk
                    .constants
                    .get(index as usize)
                    .cloned()
                    .ok_or_else(|| self.rt_err(op_ip, "constant pool index out of range"))?;
                self.push(value, op_ip)?;
                self.ip = op_ip + 3;
            }

            OpCode::LoadVar => {
                let name = self.pop_string(op_ip)?;
                let value = self.lookup_var(&name, op_ip)?;
                self.push(value, op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::StoreVar => {
                let name = self.pop_string(op_ip)?;
                let value = self.pop(op_ip)?;
                self.store_var(&name, value);
                self.ip = op_ip + 1;
            }

            OpCode::FuncDef => {
                let name = self.pop_string(op_ip)?;
                let entry = op_ip + 1;
                self.functions.insert(name.to_string(), entry);
                self.ip = self.skip_to(entry, OpCode::FuncEnd)? + 1;
            }
            OpCode::FuncEnd => {
                self.ip = op_ip + 1;
            }
            OpCode::Call => {
                let argc = self.pop_number(op_ip)? as i64;
                if argc < 0 {
                    return Err(self.rt_err(op_ip, "negative argument count"));
                }
                for _ in 0..argc {
                    self.pop(op_ip)?;
                }
                let entry = self.pop_number(op_ip)? as usize;
                self.push_frame(op_ip + 1, op_ip)?;
                self.ip = entry;
            }
            OpCode::Return => {
                let value = self.pop(op_ip)?;
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| self.rt_err(op_ip, "'return' with no active call frame"))?;
                if self.frames.is_empty() {
                    return Ok(true);
                }
                self.push(value, op_ip)?;
                self.ip = frame.return_ip;
            }

            OpCode::ObjDef => {
                let name = self.pop_string(op_ip)?;
                let entry = op_ip + 1;
                self.object_templates.insert(name.to_string(), entry);
                self.ip = self.skip_to(entry, OpCode::ObjEnd)? + 1;
            }
            OpCode::ObjEnd => {
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| self.rt_err(op_ip, "'OBJ_END' with no active frame"))?;
                self.ip = frame.return_ip;
            }
            OpCode::NewObj => {
                let name = self.pop_string(op_ip)?;
                let entry = *self
                    .object_templates
                    .get(&*name)
                    .ok_or_else(|| self.rt_err(op_ip, format!("undefined object template '{name}'")))?;
                self.push(Value::object(ObjectData::new()), op_ip)?;
                self.push_frame(op_ip + 1, op_ip)?;
                self.ip = entry;
            }
            OpCode::InitProp => {
                let name = self.pop_string(op_ip)?;
                let value = self.pop(op_ip)?;
                let obj = self.pop(op_ip)?;
                match &obj {
                    Value::Object(cell) => {
                        cell.borrow_mut().properties.insert(name.to_string(), value);
                    }
                    other => {
                        return Err(self.rt_err(
                            op_ip,
                            format!("cannot initialize a property on a {}", other.type_name()),
                        ));
                    }
                }
                self.push(obj, op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::LoadProp | OpCode::LoadPropConst => {
                // Compiler-only distinction (spec §9(b)): both read a
                // property and leave just its value on the stack. See
                // DESIGN.md for why the VM does not special-case either.
                let name = self.pop_string(op_ip)?;
                let container = self.pop(op_ip)?;
                let value = self.get_property(&container, &name, op_ip)?;
                self.push(value, op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::StoreProp => {
                let name = self.pop_string(op_ip)?;
                let value = self.pop(op_ip)?;
                let obj = self.pop(op_ip)?;
                match &obj {
                    Value::Object(cell) => {
                        cell.borrow_mut().properties.insert(name.to_string(), value);
                    }
                    other => {
                        return Err(self.rt_err(
                            op_ip,
                            format!("cannot assign a property on a {}", other.type_name()),
                        ));
                    }
                }
                self.ip = op_ip + 1;
            }

            OpCode::EnumDef => {
                let name = self.pop_string(op_ip)?;
                self.building_enum = Some(EnumBuild {
                    name: name.to_string(),
                    members: HashMap::new(),
                    next_ordinal: 0,
                });
                self.ip = op_ip + 1;
            }
            OpCode::StoreEnum => {
                let member = self.pop_string(op_ip)?;
                let build = self
                    .building_enum
                    .as_mut()
                    .ok_or_else(|| self.rt_err(op_ip, "'STORE_ENUM' outside an enum definition"))?;
                let ordinal = build.next_ordinal;
                build.members.insert(member.to_string(), ordinal);
                build.next_ordinal += 1;
                self.ip = op_ip + 1;
            }
            OpCode::EnumEnd => {
                let build = self
                    .building_enum
                    .take()
                    .ok_or_else(|| self.rt_err(op_ip, "'ENUM_END' outside an enum definition"))?;
                self.variables.insert(
                    build.name,
                    Value::Enum(Rc::new(EnumData { members: build.members })),
                );
                self.ip = op_ip + 1;
            }

            OpCode::ArrayDef => {
                let n = self.pop_number(op_ip)? as i64;
                if n < 0 {
                    return Err(self.rt_err(op_ip, "negative array literal size"));
                }
                let mut items = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    items.push(self.pop(op_ip)?);
                }
                items.reverse();
                self.push(Value::array(items), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::ArrayGet => {
                let index = self.pop_number(op_ip)?;
                let container = self.pop(op_ip)?;
                let value = match &container {
                    Value::Array(items) => {
                        let items = items.borrow();
                        let idx = self.checked_index(index, items.len(), op_ip)?;
                        items[idx].clone()
                    }
                    Value::String(s) => {
                        let chars: Vec<char> = s.chars().collect();
                        let idx = self.checked_index(index, chars.len(), op_ip)?;
                        Value::string(chars[idx].to_string())
                    }
                    other => {
                        return Err(self.rt_err(
                            op_ip,
                            format!("cannot index a {}", other.type_name()),
                        ));
                    }
                };
                self.push(value, op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::ArraySet => {
                let value = self.pop(op_ip)?;
                let index = self.pop_number(op_ip)?;
                let container = self.pop(op_ip)?;
                match &container {
                    Value::Array(items) => {
                        let len = items.borrow().len();
                        let idx = self.checked_index(index, len, op_ip)?;
                        items.borrow_mut()[idx] = value;
                    }
                    other => {
                        return Err(self.rt_err(
                            op_ip,
                            format!("cannot index-assign a {}", other.type_name()),
                        ));
                    }
                }
                self.ip = op_ip + 1;
            }

            OpCode::Sizeof => {
                let container = self.pop(op_ip)?;
                let len = container
                    .len()
                    .ok_or_else(|| self.rt_err(op_ip, format!("'{}' has no length", container.type_name())))?;
                self.push(Value::Number(len as f64), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::Jump => {
                let target = self.pop_number(op_ip)?;
                self.ip = target as usize;
            }
            OpCode::JumpIfFalse => {
                let target = self.pop_number(op_ip)?;
                let cond = self.pop_bool(op_ip)?;
                self.ip = if cond { op_ip + 1 } else { target as usize };
            }

            OpCode::Add => self.binary_add(op_ip)?,
            OpCode::Sub => self.binary_sub(op_ip)?,
            OpCode::Mul => {
                let (a, b) = self.pop_two_numbers(op_ip)?;
                self.push(Value::Number(a * b), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::Div => {
                let (a, b) = self.pop_two_numbers(op_ip)?;
                if b == 0.0 {
                    return Err(self.rt_err(op_ip, "division by zero"));
                }
                self.push(Value::Number(a / b), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::DivFloor => {
                let (a, b) = self.pop_two_numbers(op_ip)?;
                if b == 0.0 {
                    return Err(self.rt_err(op_ip, "division by zero"));
                }
                self.push(Value::Number((a / b).floor()), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::Neg => {
                let a = self.pop_number(op_ip)?;
                self.push(Value::Number(-a), op_ip)?;
                self.ip = op_ip + 1;
            }

            OpCode::CmpEq => {
                let b = self.pop(op_ip)?;
                let a = self.pop(op_ip)?;
                let eq = self.scalar_eq(&a, &b, op_ip)?;
                self.push(Value::Boolean(eq), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::CmpNe => {
                let b = self.pop(op_ip)?;
                let a = self.pop(op_ip)?;
                let eq = self.scalar_eq(&a, &b, op_ip)?;
                self.push(Value::Boolean(!eq), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::CmpLt => {
                let (a, b) = self.pop_two_numbers(op_ip)?;
                self.push(Value::Boolean(a < b), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::CmpLe => {
                let (a, b) = self.pop_two_numbers(op_ip)?;
                self.push(Value::Boolean(a <= b), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::CmpGt => {
                let (a, b) = self.pop_two_numbers(op_ip)?;
                self.push(Value::Boolean(a > b), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::CmpGe => {
                let (a, b) = self.pop_two_numbers(op_ip)?;
                self.push(Value::Boolean(a >= b), op_ip)?;
                self.ip = op_ip + 1;
            }

            OpCode::And => {
                let b = self.pop_bool(op_ip)?;
                let a = self.pop_bool(op_ip)?;
                self.push(Value::Boolean(a && b), op_ip)?;
                self.ip = op_ip + 1;
            }
            OpCode::Or => {
                let b = self.pop_bool(op_ip)?;
                let a = self.pop_bool(op_ip)?;
                self.push(Value::Boolean(a || b), op_ip)?;
                self.ip = op_ip + 1;
            }

            OpCode::Print => {
                let value = self.pop(op_ip)?;
                self.output.print(&value);
                self.ip = op_ip + 1;
            }
            OpCode::Endl => {
                self.output.endl();
                self.ip = op_ip + 1;
            }
            OpCode::StackClear => {
                let n = self.pop_number(op_ip)? as i64;
                if n < 0 {
                    return Err(self.rt_err(op_ip, "negative STACK_CLEAR count"));
                }
                for _ in 0..n {
                    self.pop(op_ip)?;
                }
                self.ip = op_ip + 1;
            }
        }
        Ok(false)
    }

    // ---- arithmetic polymorphism (spec §4.3) -------------------------------

    /// `array + x` appends `x` to the array in place and returns the same
    /// backing array (an aliasing `ADD`, not a copy) — see DESIGN.md.
    fn binary_add(&mut self, op_ip: usize) -> Result<(), GenError> {
        let b = self.pop(op_ip)?;
        let a = self.pop(op_ip)?;
        let result = match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => Value::Number(x + y),
            (Value::String(x), Value::String(y)) => Value::string(format!("{x}{y}")),
            (Value::Array(items), _) => {
                items.borrow_mut().push(b);
                a
            }
            _ => {
                return Err(self.rt_err(
                    op_ip,
                    format!("cannot add {} and {}", a.type_name(), b.type_name()),
                ));
            }
        };
        self.push(result, op_ip)?;
        self.ip = op_ip + 1;
        Ok(())
    }

    /// `SUB` on `array - number` drops that many trailing elements in place
    /// and returns the same backing array (spec §4.3; see DESIGN.md).
    fn binary_sub(&mut self, op_ip: usize) -> Result<(), GenError> {
        let b = self.pop(op_ip)?;
        let a = self.pop(op_ip)?;
        let result = match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => Value::Number(x - y),
            (Value::Array(items), Value::Number(n)) => {
                let drop_count = (*n).max(0.0) as usize;
                let mut items = items.borrow_mut();
                let keep = items.len().saturating_sub(drop_count);
                items.truncate(keep);
                drop(items);
                a
            }
            _ => {
                return Err(self.rt_err(
                    op_ip,
                    format!("cannot subtract {} from {}", b.type_name(), a.type_name()),
                ));
            }
        };
        self.push(result, op_ip)?;
        self.ip = op_ip + 1;
        Ok(())
    }

    /// `CMP_EQ`/`CMP_NE` are restricted to Number/Boolean/String and demand
    /// matching type tags on both operands — comparing across types, or
    /// comparing an Array/Object/Enum at all, is a runtime error rather than
    /// a silent structural compare (spec is silent here; ground truth is
    /// `run_cmp_eq` in the original VM, which throws on type mismatch and on
    /// any non-scalar datatype).
    fn scalar_eq(&self, a: &Value, b: &Value, op_ip: usize) -> Result<bool, GenError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(x == y),
            (Value::Boolean(x), Value::Boolean(y)) => Ok(x == y),
            (Value::String(x), Value::String(y)) => Ok(x == y),
            _ if a.type_name() != b.type_name() => Err(self.rt_err(
                op_ip,
                format!("cannot compare {} and {}", a.type_name(), b.type_name()),
            )),
            _ => Err(self.rt_err(
                op_ip,
                format!("cannot compare two values of type {}", a.type_name()),
            )),
        }
    }

    // ---- property / index access -------------------------------------------

    fn get_property(&self, container: &Value, name: &str, op_ip: usize) -> Result<Value, GenError> {
        match container {
            Value::Object(cell) => cell
                .borrow()
                .properties
                .get(name)
                .cloned()
                .ok_or_else(|| self.rt_err(op_ip, format!("object has no property '{name}'"))),
            Value::Enum(data) => data
                .members
                .get(name)
                .map(|&n| Value::Number(n as f64))
                .ok_or_else(|| self.rt_err(op_ip, format!("enum has no member '{name}'"))),
            other => Err(self.rt_err(
                op_ip,
                format!("cannot access property '{name}' on a {}", other.type_name()),
            )),
        }
    }

    fn checked_index(&self, index: f64, len: usize, op_ip: usize) -> Result<usize, GenError> {
        if index.fract() != 0.0 || index < 0.0 {
            return Err(self.rt_err(op_ip, "array index must be a non-negative integer"));
        }
        let idx = index as usize;
        if idx >= len {
            return Err(self.rt_err(op_ip, format!("index {idx} out of range (length {len})")));
        }
        Ok(idx)
    }

    // ---- variable scoping (spec §3, §4.4) -----------------------------------

    fn lookup_var(&self, name: &str, op_ip: usize) -> Result<Value, GenError> {
        if let Some(frame) = self.frames.last() {
            if let Some(value) = frame.locals.get(name) {
                return Ok(value.clone());
            }
        }
        if let Some(value) = self.variables.get(name) {
            return Ok(value.clone());
        }
        if let Some(&entry) = self.functions.get(name) {
            return Ok(Value::Number(entry as f64));
        }
        Err(self.rt_err(op_ip, format!("undefined variable or function '{name}'")))
    }

    /// Writes to whichever scope already owns `name` (innermost first),
    /// else creates the binding in the current frame, else in globals
    /// (spec §9(a)).
    fn store_var(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.locals.contains_key(name) {
                frame.locals.insert(name.to_string(), value);
                return;
            }
        }
        if self.variables.contains_key(name) {
            self.variables.insert(name.to_string(), value);
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.insert(name.to_string(), value);
        } else {
            self.variables.insert(name.to_string(), value);
        }
    }

    // ---- definition-body skipping (spec §3 "skipped ... entered only via") -

    /// Scans forward from `start`, opcode by opcode, for the first
    /// occurrence of `end_op`. Function/object bodies never nest another
    /// definition (top-level-only grammar), so a linear scan is exact.
    fn skip_to(&self, start: usize, end_op: OpCode) -> Result<usize, GenError> {
        let code = &self.chunk.code;
        let mut ip = start;
        while ip < code.len() {
            let Ok(op) = OpCode::try_from(code[ip]) else {
                return Err(self.rt_err(ip, "invalid opcode byte while skipping a definition body"));
            };
            if op == end_op {
                return Ok(ip);
            }
            ip += 1 + op.operand_len();
        }
        Err(self.rt_err(start, format!("unterminated definition body (missing {})", end_op.name())))
    }

    // ---- stack / frame plumbing ---------------------------------------------

    fn push(&mut self, value: Value, op_ip: usize) -> Result<(), GenError> {
        if self.stack.len() >= MAX_STACK {
            return Err(self.rt_err(op_ip, "value stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, op_ip: usize) -> Result<Value, GenError> {
        self.stack
            .pop()
            .ok_or_else(|| self.rt_err(op_ip, "value stack underflow"))
    }

    fn pop_number(&mut self, op_ip: usize) -> Result<f64, GenError> {
        let value = self.pop(op_ip)?;
        value
            .as_number()
            .ok_or_else(|| self.rt_err(op_ip, format!("expected a Number, found {}", value.type_name())))
    }

    fn pop_two_numbers(&mut self, op_ip: usize) -> Result<(f64, f64), GenError> {
        let b = self.pop_number(op_ip)?;
        let a = self.pop_number(op_ip)?;
        Ok((a, b))
    }

    fn pop_bool(&mut self, op_ip: usize) -> Result<bool, GenError> {
        let value = self.pop(op_ip)?;
        value
            .as_boolean()
            .ok_or_else(|| self.rt_err(op_ip, format!("expected a Boolean, found {}", value.type_name())))
    }

    fn pop_string(&mut self, op_ip: usize) -> Result<Rc<str>, GenError> {
        let value = self.pop(op_ip)?;
        match value {
            Value::String(s) => Ok(s),
            other => Err(self.rt_err(op_ip, format!("expected a String, found {}", other.type_name()))),
        }
    }

    fn push_frame(&mut self, return_ip: usize, op_ip: usize) -> Result<(), GenError> {
        if self.frames.len() >= MAX_FRAMES {
            return Err(self.rt_err(op_ip, "call stack overflow"));
        }
        self.frames.push(Frame {
            return_ip,
            locals: HashMap::new(),
        });
        Ok(())
    }

    fn rt_err(&self, ip: usize, message: impl Into<String>) -> GenError {
        let line = self.chunk.lines.get(ip).copied().unwrap_or(0);
        GenError::runtime(line, message)
    }
}
