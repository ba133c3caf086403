//! Rendering a reduced graph.
//!
//! [`to_json`] produces the machine-readable form: instances become objects
//! of their public properties in slot order, scalars become JSON scalars,
//! arrays become arrays, a reflected `Type` becomes its name and a missing
//! value becomes `null`. Bound functions are omitted. [`to_text`] renders
//! the same graph as indented text.
//!
//! Graphs that did not fully reduce, and references back to an instance
//! that is still being rendered, are errors in [`FormatMode::Strict`]. In
//! [`FormatMode::Force`] they are written as placeholders instead; the text
//! form shows unreduced nodes through the tree printer.

use std::fmt::Write;

use serde_json::{Map, Number, Value};
use vexed_common::InstanceId;
use vexed_typeck::printer::Printer;
use vexed_typeck::{Expr, Visibility};

use crate::error::EvalError;
use crate::heap::PropertySlot;
use crate::runtime::Runtime;
use crate::value::NativeValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatMode {
    #[default]
    Strict,
    Force,
}

pub const UNRESOLVED: &str = "<unresolved>";
pub const CYCLE: &str = "<cycle>";

pub fn to_json(rt: &Runtime, root: InstanceId, mode: FormatMode) -> Result<Value, EvalError> {
    Renderer::new(rt, mode).json_instance(root)
}

pub fn to_text(rt: &Runtime, root: InstanceId, mode: FormatMode) -> Result<String, EvalError> {
    let mut out = String::new();
    Renderer::new(rt, mode).text_instance(root, 0, &mut out)?;
    Ok(out)
}

struct Renderer<'a> {
    rt: &'a Runtime,
    mode: FormatMode,
    /// Dotted path of the value being rendered, for error messages.
    path: String,
    /// Instances currently being rendered, outermost first.
    stack: Vec<InstanceId>,
}

impl<'a> Renderer<'a> {
    fn new(rt: &'a Runtime, mode: FormatMode) -> Self {
        Renderer {
            rt,
            mode,
            path: String::new(),
            stack: Vec::new(),
        }
    }

    fn here(&self) -> String {
        if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.clone()
        }
    }

    fn with_segment<T>(&mut self, segment: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        let len = self.path.len();
        if !self.path.is_empty() && !segment.starts_with('[') {
            self.path.push('.');
        }
        self.path.push_str(segment);
        let result = f(self);
        self.path.truncate(len);
        result
    }

    fn unreduced(&self) -> Result<(), EvalError> {
        match self.mode {
            FormatMode::Strict => Err(EvalError::Unreduced { path: self.here() }),
            FormatMode::Force => Ok(()),
        }
    }

    fn cycle(&self) -> Result<(), EvalError> {
        match self.mode {
            FormatMode::Strict => Err(EvalError::Cycle { path: self.here() }),
            FormatMode::Force => Ok(()),
        }
    }

    fn public_slots(&self, id: InstanceId) -> impl Iterator<Item = &'a PropertySlot> + 'a {
        let rt = self.rt;
        rt.heap.instance(id).properties.iter().filter(move |slot| {
            rt.registry
                .def(slot.declaring)
                .property(&slot.name)
                .map_or(true, |p| p.visibility == Visibility::Public)
        })
    }

    // ── JSON ────────────────────────────────────────────────────────────

    /// `None` means the value is omitted from its parent.
    fn json_expr(&mut self, expr: &Expr) -> Result<Option<Value>, EvalError> {
        match expr {
            Expr::Missing { .. } => Ok(Some(Value::Null)),
            Expr::Function { .. } | Expr::UnboundFunction(_) => Ok(None),
            Expr::Instance(id) => self.json_instance(*id).map(Some),
            _ => {
                self.unreduced()?;
                Ok(Some(Value::String(UNRESOLVED.to_string())))
            }
        }
    }

    fn json_instance(&mut self, id: InstanceId) -> Result<Value, EvalError> {
        if self.stack.contains(&id) {
            self.cycle()?;
            return Ok(Value::String(CYCLE.to_string()));
        }
        let rt = self.rt;
        let value = match rt.heap.payload(id) {
            NativeValue::Int(n) => Value::from(*n),
            NativeValue::Float(x) => Number::from_f64(*x).map_or(Value::Null, Value::Number),
            NativeValue::String(s) => Value::String(s.clone()),
            NativeValue::Bool(b) => Value::Bool(*b),
            NativeValue::Type(t) => Value::String(rt.registry.name(*t).to_string()),
            NativeValue::Array(elements) => {
                self.stack.push(id);
                let mut items = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    let item = self.with_segment(&format!("[{i}]"), |r| r.json_expr(element));
                    items.push(item?.unwrap_or(Value::Null));
                }
                self.stack.pop();
                Value::Array(items)
            }
            NativeValue::None | NativeValue::Host(_) => {
                self.stack.push(id);
                let mut object = Map::new();
                for slot in self.public_slots(id) {
                    if let Some(value) = self.with_segment(&slot.name, |r| r.json_expr(&slot.expr))? {
                        object.insert(slot.name.clone(), value);
                    }
                }
                self.stack.pop();
                Value::Object(object)
            }
        };
        Ok(value)
    }

    // ── Text ────────────────────────────────────────────────────────────

    /// `Ok(false)` means the value is omitted from its parent.
    fn text_expr(&mut self, expr: &Expr, depth: usize, out: &mut String) -> Result<bool, EvalError> {
        match expr {
            Expr::Missing { .. } => out.push_str("null"),
            Expr::Function { .. } | Expr::UnboundFunction(_) => return Ok(false),
            Expr::Instance(id) => self.text_instance(*id, depth, out)?,
            _ => {
                self.unreduced()?;
                let rt = self.rt;
                let label = |id: InstanceId| rt.scalar_text(id);
                let printed = Printer::new(&rt.registry).with_labels(&label).print(expr);
                write!(out, "{UNRESOLVED} {printed}").expect("writing to a String cannot fail");
            }
        }
        Ok(true)
    }

    fn text_instance(&mut self, id: InstanceId, depth: usize, out: &mut String) -> Result<(), EvalError> {
        if self.stack.contains(&id) {
            self.cycle()?;
            out.push_str(CYCLE);
            return Ok(());
        }
        let rt = self.rt;
        match rt.heap.payload(id) {
            NativeValue::String(s) => write!(out, "{s:?}").expect("writing to a String cannot fail"),
            NativeValue::Array(elements) => {
                self.stack.push(id);
                out.push('[');
                let mut first = true;
                for (i, element) in elements.iter().enumerate() {
                    let mut item = String::new();
                    let shown =
                        self.with_segment(&format!("[{i}]"), |r| r.text_expr(element, depth, &mut item))?;
                    if !shown {
                        item.push_str("null");
                    }
                    if !first {
                        out.push_str(", ");
                    }
                    out.push_str(&item);
                    first = false;
                }
                out.push(']');
                self.stack.pop();
            }
            NativeValue::None | NativeValue::Host(_) => {
                self.stack.push(id);
                out.push_str(&rt.type_name(id));
                out.push_str(" {\n");
                let indent = "  ".repeat(depth + 1);
                for slot in self.public_slots(id) {
                    let mut value = String::new();
                    let shown = self.with_segment(&slot.name, |r| r.text_expr(&slot.expr, depth + 1, &mut value))?;
                    if shown {
                        writeln!(out, "{indent}{}: {value}", slot.name).expect("writing to a String cannot fail");
                    }
                }
                write!(out, "{}}}", "  ".repeat(depth)).expect("writing to a String cannot fail");
                self.stack.pop();
            }
            _ => {
                // Remaining payloads are scalars.
                let text = rt.scalar_text(id).unwrap_or_default();
                out.push_str(&text);
            }
        }
        Ok(())
    }
}
