//! Native type plugins.
//!
//! A plugin supplies the hooks the reducer calls when it meets an instance
//! of the plugin's type: property and index resolution, operators, native
//! method calls and the one-time seal hook. Plugins are looked up along the
//! ancestor chain, so a script class extending a native class inherits its
//! parent's plugin. Types without a plugin anywhere on their chain get
//! [`ScriptObject`], which implements the default behavior of script
//! classes.
//!
//! Every resolve hook returns `Ok(None)` to mean "not yet": the node is left
//! as it is and revisited next sweep. Plugins may answer with any node,
//! including a promise from [`Runtime::spawn_promise`] or `Expr::Missing`
//! for confirmed absence.

pub mod builtins;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use vexed_common::{HookId, InstanceId};
use vexed_typeck::{BinaryOp, Expr, MethodRef, Operator, TypeId, TypeRegistry};

use crate::error::EvalError;
use crate::runtime::Runtime;

/// What a native method call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// An argument the call needs is not an instance yet; try again next
    /// sweep.
    Deferred,
    Produced(Expr),
}

pub trait NativeType: Send + Sync {
    fn resolve_property(
        &self,
        rt: &mut Runtime,
        instance: InstanceId,
        name: &str,
    ) -> Result<Option<Expr>, EvalError> {
        resolve_slot(rt, instance, name)
    }

    fn resolve_index(
        &self,
        rt: &mut Runtime,
        instance: InstanceId,
        index: InstanceId,
    ) -> Result<Option<Expr>, EvalError> {
        let _ = index;
        Err(EvalError::UnsupportedIndex {
            ty: rt.type_name(instance),
        })
    }

    /// `operands` are instances of one and the same type.
    fn resolve_operator(
        &self,
        rt: &mut Runtime,
        op: Operator,
        operands: &[InstanceId],
    ) -> Result<Option<Expr>, EvalError> {
        identity_operator(rt, op, operands)
    }

    fn call_function(
        &self,
        rt: &mut Runtime,
        receiver: InstanceId,
        method: MethodRef,
        args: &[Expr],
    ) -> Result<CallOutcome, EvalError> {
        let _ = (receiver, args);
        Err(EvalError::MissingMethodBody {
            method: rt.registry.method(method).name.clone(),
        })
    }

    /// Fired exactly once, when the instance is sealed. May replace the
    /// instance's payload.
    fn sealed_instance(&self, rt: &mut Runtime, instance: InstanceId) -> Result<(), EvalError> {
        let _ = (rt, instance);
        Ok(())
    }
}

/// Resolve a member from the instance's own slots: a terminal property
/// value, or a method bound to the instance. A property slot that has not
/// reduced yet resolves to `None`.
pub fn resolve_slot(
    rt: &mut Runtime,
    instance: InstanceId,
    name: &str,
) -> Result<Option<Expr>, EvalError> {
    let inst = rt.heap.instance(instance);
    if let Some(slot) = inst.property(name) {
        return Ok(slot.expr.is_terminal().then(|| slot.expr.clone()));
    }
    if let Some(method) = rt.registry.find_method(inst.ty, name) {
        return Ok(Some(Expr::Function {
            method,
            receiver: instance,
        }));
    }
    Err(EvalError::UnknownProperty {
        ty: rt.type_name(instance),
        name: name.to_string(),
    })
}

/// Reference equality, the only operators every instance supports.
pub fn identity_operator(
    rt: &Runtime,
    op: Operator,
    operands: &[InstanceId],
) -> Result<Option<Expr>, EvalError> {
    match (op, operands) {
        (Operator::Binary(BinaryOp::Eq), [l, r]) => Ok(Some(Expr::bool(l == r))),
        (Operator::Binary(BinaryOp::Ne), [l, r]) => Ok(Some(Expr::bool(l != r))),
        _ => Err(EvalError::UnsupportedOperator {
            op: op.to_string(),
            ty: operands
                .first()
                .map(|&i| rt.type_name(i))
                .unwrap_or_default(),
        }),
    }
}

/// Host callback behind an `Expr::NativeMember` node.
pub type HostHook = Arc<dyn Fn(&mut Runtime, InstanceId) -> Result<Expr, EvalError> + Send + Sync>;

/// The hook `any.toString()` expands to.
pub const TO_STRING_HOOK: HookId = HookId(0);

/// The behavior of script-declared classes, and of `any`.
pub struct ScriptObject;

impl NativeType for ScriptObject {
    fn call_function(
        &self,
        rt: &mut Runtime,
        receiver: InstanceId,
        method: MethodRef,
        _args: &[Expr],
    ) -> Result<CallOutcome, EvalError> {
        let name = &rt.registry.method(method).name;
        if method.owner == TypeId::ANY && name == "toString" {
            return Ok(CallOutcome::Produced(Expr::NativeMember {
                operand: Box::new(Expr::Instance(receiver)),
                hook: TO_STRING_HOOK,
                ty: TypeId::STRING,
            }));
        }
        Err(EvalError::MissingMethodBody { method: name.clone() })
    }
}

/// Registered plugins and host hooks.
pub struct Natives {
    plugins: FxHashMap<TypeId, Arc<dyn NativeType>>,
    fallback: Arc<dyn NativeType>,
    hooks: Vec<HostHook>,
}

impl Natives {
    /// No plugins and no hooks: every type behaves as a script class.
    pub fn empty() -> Self {
        Natives {
            plugins: FxHashMap::default(),
            fallback: Arc::new(ScriptObject),
            hooks: Vec::new(),
        }
    }

    /// The plugins for the built-in scalar, array and `Type` types.
    pub fn with_builtins() -> Self {
        let mut natives = Self::empty();
        builtins::install(&mut natives);
        natives
    }

    pub fn register(&mut self, ty: TypeId, plugin: Arc<dyn NativeType>) {
        self.plugins.insert(ty, plugin);
    }

    pub fn register_hook(&mut self, hook: HostHook) -> HookId {
        let id = HookId(self.hooks.len() as u32);
        self.hooks.push(hook);
        id
    }

    pub fn hook(&self, id: HookId) -> Option<HostHook> {
        self.hooks.get(id.index()).cloned()
    }

    fn nearest(&self, registry: &TypeRegistry, ty: TypeId) -> Option<&Arc<dyn NativeType>> {
        registry
            .ancestors(ty)
            .iter()
            .rev()
            .find_map(|t| self.plugins.get(t))
    }

    /// The plugin for `ty`: the nearest registered on its ancestor chain,
    /// or the script-class behavior.
    pub fn plugin_for(&self, registry: &TypeRegistry, ty: TypeId) -> Arc<dyn NativeType> {
        self.nearest(registry, ty)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn has_plugin(&self, registry: &TypeRegistry, ty: TypeId) -> bool {
        self.nearest(registry, ty).is_some()
    }
}

impl Default for Natives {
    fn default() -> Self {
        Self::with_builtins()
    }
}
