//! The evaluation driver.
//!
//! [`Evaluator::reduce_instance`] runs sweeps until the graph under the
//! root stops changing, then awaits every promise registered along the way
//! as one concurrent batch and starts sweeping again. It returns once a
//! fixed point is reached with no promise left to await.
//!
//! A sweep:
//!
//! 1. discovers the scopes, instances and promises reachable from the root
//!    (see [`crate::walk`]);
//! 2. reduces every scope binding that is not terminal yet;
//! 3. reduces every instance's property slots, then its array elements;
//! 4. seals what can be sealed (see [`crate::seal`]).
//!
//! A fixed point with nothing left to await must leave the root sealed.
//! Anything else means some nodes wait on each other forever, which is the
//! same failure as running past the sweep ceiling. The partial graph stays
//! on the heap, so force formatting can still show what is left.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use vexed_common::{HookId, InstanceId, PromiseId, ScopeId};
use vexed_typeck::{Expr, TypeId, TypeRegistry};

use crate::config::{EvalConfig, PropertyOrder};
use crate::construct::construct;
use crate::error::EvalError;
use crate::format::{self, FormatMode};
use crate::native::{HostHook, NativeType};
use crate::promise::await_batch;
use crate::reduce::Reducer;
use crate::runtime::Runtime;
use crate::seal::seal;
use crate::value::NativeValue;
use crate::walk::discover;

/// Work done by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepCost {
    pub scopes: usize,
    pub instances: usize,
    pub reductions: usize,
    pub sealed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReduceStats {
    pub sweeps: usize,
    /// Promise batches awaited.
    pub batches: usize,
    pub per_sweep: Vec<SweepCost>,
}

impl ReduceStats {
    pub fn reductions(&self) -> usize {
        self.per_sweep.iter().map(|c| c.reductions).sum()
    }
}

pub struct Evaluator {
    rt: Runtime,
    config: EvalConfig,
}

impl Evaluator {
    pub fn new(registry: TypeRegistry) -> Self {
        Self::with_config(registry, EvalConfig::default())
    }

    pub fn with_config(registry: TypeRegistry, config: EvalConfig) -> Self {
        Evaluator {
            rt: Runtime::new(registry),
            config,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.rt
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Install `plugin` for `ty` and every subclass without a nearer one.
    pub fn register_native(&mut self, ty: TypeId, plugin: Arc<dyn NativeType>) {
        self.rt.natives.register(ty, plugin);
    }

    pub fn register_hook(&mut self, hook: HostHook) -> HookId {
        self.rt.natives.register_hook(hook)
    }

    /// Allocate an instance of `class`. Arguments must be closed (typically
    /// literals); nothing is evaluated until [`Self::reduce_instance`].
    pub fn instantiate(&mut self, class: TypeId, args: Vec<Expr>) -> Result<InstanceId, EvalError> {
        construct(&mut self.rt, class, args)
    }

    /// Reduce the graph under `root` to a fixed point.
    #[instrument(skip(self))]
    pub async fn reduce_instance(&mut self, root: InstanceId) -> Result<ReduceStats, EvalError> {
        let mut stats = ReduceStats::default();
        loop {
            loop {
                if stats.sweeps >= self.config.max_sweeps {
                    return Err(EvalError::NonTermination {
                        sweeps: stats.sweeps,
                    });
                }
                let cost = self.sweep(root)?;
                stats.sweeps += 1;
                stats.per_sweep.push(cost);
                debug!(
                    sweep = stats.sweeps,
                    scopes = cost.scopes,
                    instances = cost.instances,
                    reductions = cost.reductions,
                    sealed = cost.sealed,
                    "sweep"
                );
                if cost.reductions == 0 && cost.sealed == 0 {
                    break;
                }
            }

            let pending: Vec<PromiseId> = discover(&self.rt.heap, root)
                .promises
                .into_iter()
                .filter(|&p| self.rt.heap.promise(p).is_pending())
                .collect();
            if pending.is_empty() {
                if !self.rt.heap.instance(root).sealed {
                    warn!(sweeps = stats.sweeps, "reduction stalled before the root sealed");
                    return Err(EvalError::NonTermination {
                        sweeps: stats.sweeps,
                    });
                }
                break;
            }
            await_batch(&mut self.rt.heap, &pending).await;
            stats.batches += 1;
        }

        info!(
            sweeps = stats.sweeps,
            batches = stats.batches,
            "reduction finished"
        );
        Ok(stats)
    }

    fn ordered<T: Copy>(&self, items: &[T]) -> Vec<T> {
        match self.config.property_order {
            PropertyOrder::Declared => items.to_vec(),
            PropertyOrder::Reverse => items.iter().rev().copied().collect(),
        }
    }

    fn sweep(&mut self, root: InstanceId) -> Result<SweepCost, EvalError> {
        let found = discover(&self.rt.heap, root);
        let mut reductions = 0;

        for scope in self.ordered(&found.scopes) {
            reductions += self.reduce_bindings(scope)?;
        }
        for id in self.ordered(&found.instances) {
            reductions += self.reduce_slots(id)?;
            reductions += self.reduce_elements(id)?;
        }
        let sealed = seal(&mut self.rt, &found)?;

        Ok(SweepCost {
            scopes: found.scopes.len(),
            instances: found.instances.len(),
            reductions,
            sealed,
        })
    }

    /// Fold one node and count the rewrites. The node is cloned out of the
    /// heap first so the reducer may freely mutate the heap meanwhile.
    fn reduce_one(&mut self, expr: Expr) -> Result<(Expr, usize), EvalError> {
        let mut reducer = Reducer::new(&mut self.rt, None);
        let next = reducer.reduce(expr)?;
        Ok((next, reducer.progress()))
    }

    fn reduce_bindings(&mut self, scope: ScopeId) -> Result<usize, EvalError> {
        let count = self.rt.heap.scope(scope).bindings.len();
        let indices: Vec<usize> = (0..count).collect();
        let mut total = 0;
        for i in self.ordered(&indices) {
            let expr = self.rt.heap.scope(scope).bindings[i].expr.clone();
            if expr.is_terminal() {
                continue;
            }
            let (next, n) = self.reduce_one(expr)?;
            self.rt.heap.scope_mut(scope).bindings[i].expr = next;
            total += n;
        }
        Ok(total)
    }

    fn reduce_slots(&mut self, id: InstanceId) -> Result<usize, EvalError> {
        let count = self.rt.heap.instance(id).properties.len();
        let indices: Vec<usize> = (0..count).collect();
        let mut total = 0;
        for i in self.ordered(&indices) {
            let expr = self.rt.heap.instance(id).properties[i].expr.clone();
            if expr.is_terminal() {
                continue;
            }
            let (next, n) = self.reduce_one(expr)?;
            self.rt.heap.instance_mut(id).properties[i].expr = next;
            total += n;
        }
        Ok(total)
    }

    fn reduce_elements(&mut self, id: InstanceId) -> Result<usize, EvalError> {
        let NativeValue::Array(elements) = self.rt.heap.payload(id) else {
            return Ok(0);
        };
        let indices: Vec<usize> = (0..elements.len()).collect();
        let mut total = 0;
        for i in self.ordered(&indices) {
            let expr = match self.rt.heap.payload(id) {
                NativeValue::Array(elements) => elements[i].clone(),
                _ => break,
            };
            if expr.is_terminal() {
                continue;
            }
            let (next, n) = self.reduce_one(expr)?;
            if let NativeValue::Array(elements) = &mut self.rt.heap.instance_mut(id).payload {
                elements[i] = next;
            }
            total += n;
        }
        Ok(total)
    }

    pub fn to_json(&self, root: InstanceId, mode: FormatMode) -> Result<serde_json::Value, EvalError> {
        format::to_json(&self.rt, root, mode)
    }

    pub fn to_text(&self, root: InstanceId, mode: FormatMode) -> Result<String, EvalError> {
        format::to_text(&self.rt, root, mode)
    }
}
