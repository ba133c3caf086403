//! Vexed type system and typed syntax tree.
//!
//! This crate holds everything the evaluator needs to know about a program
//! before it runs: the registry of types, the typed tree lowering produces,
//! and the site checks lowering uses to keep a single malformed declaration
//! from cascading into many diagnostics.
//!
//! # Architecture
//!
//! - [`ty`]: type ids, definitions, properties and methods
//! - [`registry`]: the flat type namespace with memoized structural types
//!   and poison types
//! - [`builtins`]: built-in types at reserved ids and their native members
//! - [`unify`]: assignability with one-directional generic inference
//! - [`check`]: site checks that record one [`TypeError`] and substitute
//!   poison
//! - [`error`] / [`diagnostics`]: type errors and their ariadne rendering
//! - [`tst`]: the typed tree; [`visit`]: `Fold` and `Visit` traversals
//! - [`printer`]: single-line rendering of tree nodes
//! - [`builder`]: programmatic class declarations

pub mod builder;
pub mod builtins;
pub mod check;
pub mod diagnostics;
pub mod error;
pub mod printer;
pub mod registry;
pub mod tst;
pub mod ty;
pub mod unify;
pub mod visit;

pub use builder::ClassBuilder;
pub use check::{CallCheck, Checker};
pub use error::{ConstraintOrigin, TypeError};
pub use registry::{RegistryError, TypeRegistry};
pub use tst::{BinaryOp, Block, Expr, Literal, Operator, Stmt, UnaryOp};
pub use ty::{MethodDef, MethodRef, Param, PropertyDef, TypeDefinition, TypeId, TypeKind, Visibility};
