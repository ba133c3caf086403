//! One sweep's worth of rewriting.
//!
//! The [`Reducer`] folds a tree once, rewriting every node whose inputs are
//! ready and leaving the rest untouched for a later sweep. It never loops:
//! a node produced by a rewrite (a call's body, a plugin's answer, a
//! resolved promise) is not folded again until the next sweep, which keeps
//! each sweep bounded and makes progress measurable. `progress` counts
//! rewrites; a sweep in which no reducer made progress is a fixed point.
//!
//! Evaluation is lazy and order-independent. Bindings and property slots
//! hold scoped nodes until something needs them, and no rewrite depends on
//! the order in which sibling nodes are visited.

use tracing::trace;
use vexed_common::{HookId, InstanceId, PromiseId, ScopeId};
use vexed_typeck::visit::{is_closed, Fold};
use vexed_typeck::{BinaryOp, Block, Expr, Literal, Operator, Stmt, TypeId, UnaryOp};

use crate::construct::construct;
use crate::error::EvalError;
use crate::heap::{Binding, PromiseState, Scope};
use crate::native::CallOutcome;
use crate::runtime::Runtime;
use crate::value::NativeValue;

pub struct Reducer<'rt> {
    rt: &'rt mut Runtime,
    scope: Option<ScopeId>,
    progress: usize,
}

impl<'rt> Reducer<'rt> {
    /// A reducer for nodes living directly in `scope`, or in no scope at
    /// all (instance slots are always wrapped in their own `Scoped`).
    pub fn new(rt: &'rt mut Runtime, scope: Option<ScopeId>) -> Self {
        Reducer {
            rt,
            scope,
            progress: 0,
        }
    }

    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn reduce(&mut self, expr: Expr) -> Result<Expr, EvalError> {
        self.fold_expr(expr)
    }

    fn rewrote(&mut self, expr: Expr) -> Result<Expr, EvalError> {
        self.progress += 1;
        Ok(expr)
    }

    /// Close a node over the current scope before it moves somewhere else.
    fn in_scope(&self, expr: Expr) -> Expr {
        match self.scope {
            Some(scope) if !expr.is_terminal() => Expr::scoped(scope, expr),
            _ => expr,
        }
    }

    /// Replace generic placeholders with the arguments bound by the
    /// enclosing call. Placeholders nothing binds become `any`.
    fn substitute(&mut self, ty: TypeId) -> TypeId {
        self.substitute_with(ty, &[])
    }

    /// As [`Self::substitute`], but `local` bindings win over the scope's.
    fn substitute_with(&mut self, ty: TypeId, local: &[(TypeId, TypeId)]) -> TypeId {
        let rt = &mut *self.rt;
        let heap = &rt.heap;
        let scope = self.scope;
        rt.registry.substitute(ty, &|param| {
            let bound = local.iter().find(|(p, _)| *p == param).map(|&(_, arg)| arg);
            Some(
                bound
                    .or_else(|| scope.and_then(|s| heap.type_arg(s, param)))
                    .unwrap_or(TypeId::ANY),
            )
        })
    }

    fn instance_ty(&self, id: InstanceId) -> TypeId {
        self.rt.heap.instance(id).ty
    }

    // ── Leaves ──────────────────────────────────────────────────────────

    fn literal(&mut self, lit: Literal) -> Result<Expr, EvalError> {
        let (ty, payload) = match lit {
            Literal::Int(n) => (TypeId::INT, NativeValue::Int(n)),
            Literal::Float(x) => (TypeId::FLOAT, NativeValue::Float(x)),
            Literal::String(s) => (TypeId::STRING, NativeValue::String(s)),
            Literal::Bool(b) => (TypeId::BOOL, NativeValue::Bool(b)),
            Literal::Array { elements, ty } => {
                let ty = self.substitute(ty);
                let elements = elements.into_iter().map(|e| self.in_scope(e)).collect();
                (ty, NativeValue::Array(elements))
            }
        };
        let id = self.rt.alloc_value(ty, payload);
        self.rewrote(Expr::Instance(id))
    }

    fn this(&mut self) -> Result<Expr, EvalError> {
        let receiver = self
            .scope
            .and_then(|s| self.rt.heap.receiver(s))
            .ok_or(EvalError::MissingReceiver)?;
        self.rewrote(Expr::Instance(receiver))
    }

    fn binding(&mut self, expr: Expr, name: &str) -> Result<Expr, EvalError> {
        let found = self.scope.and_then(|s| self.rt.heap.lookup(s, name));
        let Some((scope, index)) = found else {
            return Err(EvalError::UnknownBinding {
                name: name.to_string(),
            });
        };
        match &self.rt.heap.scope(scope).bindings[index].expr {
            Expr::UnboundFunction(method) => {
                let method = *method;
                let receiver = self
                    .rt
                    .heap
                    .receiver(scope)
                    .ok_or(EvalError::MissingReceiver)?;
                self.rewrote(Expr::Function { method, receiver })
            }
            bound if bound.is_terminal() => {
                let bound = bound.clone();
                self.rewrote(bound)
            }
            _ => Ok(expr),
        }
    }

    // ── Member access and operators ─────────────────────────────────────

    fn member(&mut self, object: Expr, name: String, ty: TypeId) -> Result<Expr, EvalError> {
        let object = self.fold_expr(object)?;
        match object {
            Expr::Missing { .. } => self.rewrote(Expr::missing(ty)),
            Expr::Instance(id) => {
                let plugin = self.rt.natives.plugin_for(&self.rt.registry, self.instance_ty(id));
                match plugin.resolve_property(self.rt, id, &name)? {
                    Some(resolved) => self.rewrote(resolved),
                    None => Ok(Expr::member(object, name, ty)),
                }
            }
            object => Ok(Expr::member(object, name, ty)),
        }
    }

    fn index(&mut self, object: Expr, index: Expr, ty: TypeId) -> Result<Expr, EvalError> {
        let object = self.fold_expr(object)?;
        let index = self.fold_expr(index)?;
        match (&object, &index) {
            (Expr::Missing { .. }, _) | (_, Expr::Missing { .. }) => self.rewrote(Expr::missing(ty)),
            (&Expr::Instance(obj), &Expr::Instance(idx)) => {
                let plugin = self.rt.natives.plugin_for(&self.rt.registry, self.instance_ty(obj));
                match plugin.resolve_index(self.rt, obj, idx)? {
                    Some(resolved) => self.rewrote(resolved),
                    None => Ok(Expr::index(object, index, ty)),
                }
            }
            _ => Ok(Expr::index(object, index, ty)),
        }
    }

    fn bool_payload(&self, id: InstanceId) -> Option<bool> {
        match self.rt.heap.payload(id) {
            NativeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr, ty: TypeId) -> Result<Expr, EvalError> {
        let lhs = self.fold_expr(lhs)?;

        // `false && x` and `true || x` do not wait for `x`.
        if let Some(b) = lhs.as_instance().and_then(|id| self.bool_payload(id)) {
            match (op, b) {
                (BinaryOp::And, false) | (BinaryOp::Or, true) => {
                    return self.rewrote(Expr::bool(b));
                }
                _ => {}
            }
        }

        let rhs = self.fold_expr(rhs)?;
        match (&lhs, &rhs) {
            (Expr::Missing { .. }, _) | (_, Expr::Missing { .. }) => self.rewrote(Expr::missing(ty)),
            (&Expr::Instance(l), &Expr::Instance(r)) => {
                let (lty, rty) = (self.instance_ty(l), self.instance_ty(r));
                if lty != rty {
                    return Err(EvalError::OperandTypeMismatch {
                        op: op.symbol().to_string(),
                        lhs: self.rt.registry.name(lty).to_string(),
                        rhs: self.rt.registry.name(rty).to_string(),
                    });
                }
                let plugin = self.rt.natives.plugin_for(&self.rt.registry, lty);
                match plugin.resolve_operator(self.rt, Operator::Binary(op), &[l, r])? {
                    Some(result) => self.rewrote(result),
                    None => Ok(Expr::binary(op, lhs, rhs, ty)),
                }
            }
            _ => Ok(Expr::binary(op, lhs, rhs, ty)),
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: Expr, ty: TypeId) -> Result<Expr, EvalError> {
        if op == UnaryOp::TypeOf {
            // Reflects the static type; the operand is never evaluated.
            let reflected = match &operand {
                Expr::Instance(id) => self.instance_ty(*id),
                other => other.declared_ty().unwrap_or(TypeId::ANY),
            };
            let reflected = self.substitute(reflected);
            let id = self.rt.alloc_value(TypeId::TYPE, NativeValue::Type(reflected));
            return self.rewrote(Expr::Instance(id));
        }

        let operand = self.fold_expr(operand)?;
        match operand {
            Expr::Missing { .. } => self.rewrote(Expr::missing(ty)),
            Expr::Instance(id) => {
                let plugin = self.rt.natives.plugin_for(&self.rt.registry, self.instance_ty(id));
                match plugin.resolve_operator(self.rt, Operator::Unary(op), &[id])? {
                    Some(result) => self.rewrote(result),
                    None => Ok(Expr::unary(op, operand, ty)),
                }
            }
            operand => Ok(Expr::unary(op, operand, ty)),
        }
    }

    // ── Construction and calls ──────────────────────────────────────────

    fn new_instance(&mut self, class: TypeId, args: Vec<Expr>) -> Result<Expr, EvalError> {
        let args = args.into_iter().map(|a| self.in_scope(a)).collect();
        let id = construct(self.rt, class, args)?;
        self.rewrote(Expr::Instance(id))
    }

    fn call(
        &mut self,
        callee: Expr,
        args: Vec<Expr>,
        type_args: Vec<(TypeId, TypeId)>,
        ty: TypeId,
    ) -> Result<Expr, EvalError> {
        let callee = self.fold_expr(callee)?;
        let args = args
            .into_iter()
            .map(|a| self.fold_expr(a))
            .collect::<Result<Vec<_>, _>>()?;

        let (method, receiver) = match callee {
            Expr::Missing { .. } => return self.rewrote(Expr::missing(ty)),
            Expr::Function { method, receiver } => (method, receiver),
            callee => {
                return Ok(Expr::Call {
                    callee: Box::new(callee),
                    args,
                    type_args,
                    ty,
                })
            }
        };

        let def = self.rt.registry.method(method);
        let Some(body) = def.body.clone() else {
            let plugin = self.rt.natives.plugin_for(&self.rt.registry, method.owner);
            return match plugin.call_function(self.rt, receiver, method, &args)? {
                CallOutcome::Produced(result) => self.rewrote(result),
                CallOutcome::Deferred => Ok(Expr::Call {
                    callee: Box::new(Expr::Function { method, receiver }),
                    args,
                    type_args,
                    ty,
                }),
            };
        };
        let params = def.params.clone();
        let name = def.name.clone();

        let parent = self
            .rt
            .heap
            .instance(receiver)
            .ctor_scope(method.owner)
            .ok_or_else(|| EvalError::MissingMethodScope {
                ty: self.rt.type_name(receiver),
                owner: self.rt.registry.name(method.owner).to_string(),
            })?;

        let type_args: Vec<(TypeId, TypeId)> = type_args
            .into_iter()
            .map(|(param, arg)| (param, self.substitute(arg)))
            .collect();

        // Parameters the caller left out are missing values of their
        // substituted type.
        let mut given = args.into_iter();
        let mut bindings = Vec::with_capacity(params.len());
        for p in params {
            let expr = match given.next() {
                Some(arg) => self.in_scope(arg),
                None => Expr::missing(self.substitute_with(p.ty, &type_args)),
            };
            bindings.push(Binding {
                name: p.name,
                expr,
                ty: p.ty,
            });
        }

        let scope = self.rt.heap.alloc_scope(Scope {
            parent: Some(parent),
            receiver: Some(receiver),
            bindings,
            type_args,
        });
        trace!(method = %name, %receiver, %scope, "call");
        self.rewrote(Expr::scoped(scope, Expr::Block(body)))
    }

    fn native_member(&mut self, operand: Expr, hook: HookId, ty: TypeId) -> Result<Expr, EvalError> {
        let operand = self.fold_expr(operand)?;
        match operand {
            Expr::Missing { .. } => self.rewrote(Expr::missing(ty)),
            Expr::Instance(id) => {
                let callback = self.rt.natives.hook(hook).ok_or_else(|| EvalError::UnknownHook {
                    hook: hook.to_string(),
                })?;
                let result = callback(self.rt, id)?;
                self.rewrote(result)
            }
            operand => Ok(Expr::NativeMember {
                operand: Box::new(operand),
                hook,
                ty,
            }),
        }
    }

    fn promise(&mut self, id: PromiseId, ty: TypeId) -> Result<Expr, EvalError> {
        let state = std::mem::replace(self.rt.heap.promise_mut(id), PromiseState::InFlight { ty });
        let (state, outcome) = match state {
            // The first reader converts the result; later readers share it.
            PromiseState::Settled(Ok(value)) => {
                let expr = self.rt.materialize(value);
                (PromiseState::Resolved(expr.clone()), Ok(Some(expr)))
            }
            PromiseState::Settled(Err(message)) | PromiseState::Rejected(message) => (
                PromiseState::Rejected(message.clone()),
                Err(EvalError::PromiseRejected { message }),
            ),
            PromiseState::Resolved(expr) => (PromiseState::Resolved(expr.clone()), Ok(Some(expr))),
            pending => (pending, Ok(None)),
        };
        *self.rt.heap.promise_mut(id) = state;
        match outcome? {
            Some(expr) => self.rewrote(expr),
            None => Ok(Expr::Promise { id, ty }),
        }
    }

    // ── Scopes and bodies ───────────────────────────────────────────────

    fn scoped(&mut self, scope: ScopeId, expr: Expr) -> Result<Expr, EvalError> {
        let outer = self.scope.replace(scope);
        let before = self.progress;
        let inner = self.fold_expr(expr);
        self.scope = outer;
        let inner = inner?;

        let stalled = self.progress == before;
        let closed = || self.rt.heap.is_scope_reduced(scope) && is_closed(&inner, &self.rt.registry);
        if inner.is_terminal() || (stalled && closed()) {
            trace!(%scope, "collapsed");
            return self.rewrote(inner);
        }
        Ok(Expr::scoped(scope, inner))
    }

    /// Statements run one at a time, in order. Only the first statement of
    /// a block is looked at in a sweep.
    fn block(&mut self, block: Block) -> Result<Expr, EvalError> {
        let Block { mut stmts, ret } = block;
        if stmts.is_empty() {
            let ret = self.substitute(ret);
            return self.rewrote(Expr::missing(ret));
        }
        let first = stmts.remove(0);
        match first {
            Stmt::Return(expr) => self.rewrote(expr),

            Stmt::LocalDecl { name, ty, init } => {
                let init = self.in_scope(init);
                let local = self.rt.heap.alloc_scope(Scope {
                    parent: self.scope,
                    bindings: vec![Binding { name, expr: init, ty }],
                    ..Scope::default()
                });
                self.rewrote(Expr::scoped(local, Expr::Block(Block::new(stmts, ret))))
            }

            Stmt::LocalAssign { name, value } => {
                let value = self.fold_expr(value)?;
                if !value.is_terminal() {
                    stmts.insert(0, Stmt::LocalAssign { name, value });
                    return Ok(Expr::Block(Block::new(stmts, ret)));
                }
                let (scope, index) = self
                    .scope
                    .and_then(|s| self.rt.heap.lookup(s, &name))
                    .ok_or(EvalError::UnknownBinding { name })?;
                self.rt.heap.scope_mut(scope).bindings[index].expr = value;
                self.rewrote(Expr::Block(Block::new(stmts, ret)))
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.fold_expr(cond)?;
                let taken = match &cond {
                    Expr::Missing { .. } => Some(false),
                    Expr::Instance(id) => match self.bool_payload(*id) {
                        Some(b) => Some(b),
                        None => {
                            return Err(EvalError::InvalidPayload {
                                ty: self.rt.type_name(*id),
                                expected: "bool",
                            })
                        }
                    },
                    _ => None,
                };
                match taken {
                    Some(taken) => {
                        let mut spliced = if taken { then_branch } else { else_branch };
                        spliced.extend(stmts);
                        self.rewrote(Expr::Block(Block::new(spliced, ret)))
                    }
                    None => {
                        stmts.insert(
                            0,
                            Stmt::If {
                                cond,
                                then_branch,
                                else_branch,
                            },
                        );
                        Ok(Expr::Block(Block::new(stmts, ret)))
                    }
                }
            }
        }
    }
}

impl Fold for Reducer<'_> {
    type Error = EvalError;

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr, EvalError> {
        match expr {
            Expr::Literal(lit) => self.literal(lit),
            Expr::This { .. } => self.this(),
            Expr::Param { ref name, .. } | Expr::Variable { ref name, .. } => {
                let name = name.clone();
                self.binding(expr, &name)
            }
            Expr::Member { object, name, ty } => self.member(*object, name, ty),
            Expr::Index { object, index, ty } => self.index(*object, *index, ty),
            Expr::Binary { op, lhs, rhs, ty } => self.binary(op, *lhs, *rhs, ty),
            Expr::Unary { op, operand, ty } => self.unary(op, *operand, ty),
            Expr::New { class, args } => self.new_instance(class, args),
            Expr::Call {
                callee,
                args,
                type_args,
                ty,
            } => self.call(*callee, args, type_args, ty),
            Expr::NativeMember { operand, hook, ty } => self.native_member(*operand, hook, ty),
            Expr::Promise { id, ty } => self.promise(id, ty),
            Expr::Scoped { scope, expr } => self.scoped(scope, *expr),
            Expr::Block(block) => self.block(block),
            terminal @ (Expr::Instance(_)
            | Expr::Missing { .. }
            | Expr::UnboundFunction(_)
            | Expr::Function { .. }) => Ok(terminal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vexed_typeck::TypeRegistry;

    fn reduce_fully(rt: &mut Runtime, mut expr: Expr) -> Expr {
        for _ in 0..32 {
            let mut r = Reducer::new(rt, None);
            expr = r.reduce(expr).unwrap();
            if r.progress() == 0 {
                break;
            }
        }
        expr
    }

    fn int_of(rt: &Runtime, expr: &Expr) -> i64 {
        match rt.heap.payload(expr.as_instance().unwrap()) {
            NativeValue::Int(n) => *n,
            other => panic!("expected int, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_reduces_bottom_up() {
        let mut rt = Runtime::new(TypeRegistry::new());
        let e = Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, Expr::int(2), Expr::int(3), TypeId::INT),
            Expr::int(4),
            TypeId::INT,
        );
        let out = reduce_fully(&mut rt, e);
        assert_eq!(int_of(&rt, &out), 20);
    }

    #[test]
    fn one_sweep_does_not_refold_results() {
        let mut rt = Runtime::new(TypeRegistry::new());
        let e = Expr::binary(BinaryOp::Add, Expr::int(2), Expr::int(3), TypeId::INT);
        let mut r = Reducer::new(&mut rt, None);
        let out = r.reduce(e).unwrap();
        // The sum stays a literal until the next sweep allocates it.
        assert_eq!(out, Expr::int(5));
        assert_eq!(r.progress(), 3);
    }

    #[test]
    fn missing_propagates_through_operators() {
        let mut rt = Runtime::new(TypeRegistry::new());
        let e = Expr::binary(BinaryOp::Add, Expr::missing(TypeId::INT), Expr::int(1), TypeId::INT);
        assert_eq!(reduce_fully(&mut rt, e), Expr::missing(TypeId::INT));
    }

    #[test]
    fn mismatched_operands_are_fatal() {
        let mut rt = Runtime::new(TypeRegistry::new());
        let e = Expr::binary(BinaryOp::Add, Expr::int(1), Expr::string("a"), TypeId::INT);
        let mut expr = e;
        let err = loop {
            let mut r = Reducer::new(&mut rt, None);
            match r.reduce(expr) {
                Ok(next) => expr = next,
                Err(e) => break e,
            }
        };
        assert_eq!(
            err,
            EvalError::OperandTypeMismatch {
                op: "+".into(),
                lhs: "int".into(),
                rhs: "string".into()
            }
        );
    }

    #[test]
    fn typeof_never_evaluates_its_operand() {
        let mut rt = Runtime::new(TypeRegistry::new());
        let e = Expr::unary(
            UnaryOp::TypeOf,
            Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0), TypeId::INT),
            TypeId::TYPE,
        );
        let out = reduce_fully(&mut rt, e);
        assert_eq!(rt.scalar_text(out.as_instance().unwrap()).as_deref(), Some("int"));
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        let mut rt = Runtime::new(TypeRegistry::new());
        let e = Expr::binary(
            BinaryOp::And,
            Expr::bool(false),
            Expr::var("nowhere", TypeId::BOOL),
            TypeId::BOOL,
        );
        let out = reduce_fully(&mut rt, e);
        assert_eq!(rt.scalar_text(out.as_instance().unwrap()).as_deref(), Some("false"));
    }

    #[test]
    fn unbound_names_are_fatal() {
        let mut rt = Runtime::new(TypeRegistry::new());
        let mut r = Reducer::new(&mut rt, None);
        let err = r.reduce(Expr::var("x", TypeId::INT)).unwrap_err();
        assert_eq!(err, EvalError::UnknownBinding { name: "x".into() });
    }
}
