// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Package-level artifact assembler and source emitter for sieve.
//!
//! `sieve-packgen` sits at the back of the rule-compilation pipeline. As
//! upstream translation turns individual rules, queries, globals and
//! helper declarations into `syn` artifacts, it appends them to a
//! [`PackageRegistry`]. A single [`render`](PackageRegistry::render) pass
//! then partitions the accumulated artifacts into one primary unit plus
//! zero or more secondary units and prints each as Rust source text for
//! the downstream compiler to build and link together.
//!
//! # Why units split
//!
//! Generated packages can carry thousands of rules, and the downstream
//! toolchain bounds how much it will compile per unit. Two independent
//! thresholds govern partitioning: every `rules_per_holder` consecutive
//! rule bodies move into their own method-holder unit, and once the rule
//! count reaches `rules_per_chunk - 1` the rule list itself is split into
//! bulk-appendable chunk units. Cross-unit references go through `super::`
//! paths, so all units of a package must be mounted as sibling modules.
//!
//! # Ordering Invariant
//!
//! Rule declaration order is implicit evaluation priority. The registry
//! keeps rules in an insertion-ordered map and the emission engine appends
//! accessor calls in that same order, so the concatenation of the primary
//! rule list with every chunk list (in chunk order) always reproduces the
//! declared sequence. The remaining declaration maps are insertion-ordered
//! too, purely so that repeated builds emit identical text.
//!
//! # Lifecycle
//!
//! A registry serves exactly one package-compile session: `Building`
//! while upstream appends, `Emitted` after the one render. Rendering
//! twice is a usage error, not a silent re-render.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod config;
mod emit;
mod error;
mod imports;
mod naming;
mod registry;
mod resolve;
mod split;

/// Generation mode and package-wide configuration.
pub use config::{DslFlavor, PackageConfig};
/// Rendered units and the per-package result set.
pub use emit::{RenderedPackage, Unit};
/// Error taxonomy; every failure is terminal for the current package.
pub use error::{ArtifactKind, PackError, TypeResolutionError};
/// The single-use artifact accumulator and its collaborator seams.
pub use registry::{
    AccumulateFn, ExprIdGenerator, NamespacedType, PackageRegistry, QueryDef, QueryParam,
    SessionState,
};
/// Type-resolution seam injected by the host compiler.
pub use resolve::{StaticMember, TypeHandle, TypeResolver};
/// Pure partitioning arithmetic for rule artifacts.
pub use split::SplitPlan;
