// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Import management for generated units.
//!
//! Every unit opens with a fixed baseline (date/time names, the rule-DSL
//! namespace bound as `d`, the constraint-type enum, the runtime prelude)
//! followed by the package's own imports. A wildcard import equal to the
//! package itself is always stripped; it would only re-import the unit's
//! own namespace. Chunk units carry just the prelude, they reference
//! nothing else.
//!
//! Sets are insertion-ordered, so rendered import lists are deterministic
//! even though membership order carries no meaning.

use indexmap::IndexSet;

use crate::config::DslFlavor;
use crate::error::PackError;

/// Borrowed view of the package state import rendering needs.
pub(crate) struct ImportEnv<'a> {
    /// Generation mode, selects the DSL namespace.
    pub flavor: DslFlavor,
    /// Package identity, used to strip the self wildcard.
    pub package: &'a str,
    /// User-supplied plain imports.
    pub imports: &'a IndexSet<String>,
    /// User-supplied static imports.
    pub static_imports: &'a IndexSet<String>,
}

/// Baseline imports present in every primary and holder unit.
fn fixed(flavor: DslFlavor) -> [&'static str; 4] {
    let dsl = match flavor {
        DslFlavor::Pattern => "sieve_rt::dsl::pattern as d",
        DslFlavor::Flow => "sieve_rt::dsl::flow as d",
    };
    [
        "chrono::{NaiveDate, NaiveDateTime, NaiveTime}",
        dsl,
        "sieve_rt::index::ConstraintType",
        "sieve_rt::prelude::*",
    ]
}

fn use_item(decl: &str) -> Result<syn::ItemUse, PackError> {
    syn::parse_str(&format!("use {decl};")).map_err(|_| PackError::Render {
        detail: format!("invalid import path `{decl}`"),
    })
}

fn baseline_and_user(env: &ImportEnv<'_>) -> Result<Vec<syn::ItemUse>, PackError> {
    let self_glob = format!("{}::*", env.package);
    let mut uses = Vec::new();
    for decl in fixed(env.flavor) {
        uses.push(use_item(decl)?);
    }
    for decl in env.imports {
        if *decl == self_glob {
            continue; // skip same-package star import
        }
        uses.push(use_item(decl)?);
    }
    for decl in env.static_imports {
        uses.push(use_item(decl)?);
    }
    Ok(uses)
}

/// Imports for the primary unit.
pub(crate) fn primary_imports(env: &ImportEnv<'_>) -> Result<Vec<syn::ItemUse>, PackError> {
    baseline_and_user(env)
}

/// Imports for a method-holder unit: the full set plus a glob of the
/// primary unit, so rule bodies can reach its generated items.
pub(crate) fn holder_imports(
    env: &ImportEnv<'_>,
    primary_unit: &str,
) -> Result<Vec<syn::ItemUse>, PackError> {
    let mut uses = baseline_and_user(env)?;
    uses.push(use_item(&format!("super::{primary_unit}::*"))?);
    Ok(uses)
}

/// Imports for a rule-list chunk unit: prelude only.
pub(crate) fn chunk_imports() -> Result<Vec<syn::ItemUse>, PackError> {
    Ok(vec![use_item("sieve_rt::prelude::*")?])
}
