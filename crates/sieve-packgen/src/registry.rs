// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mutable artifact registry for one package-compile session.
//!
//! Upstream translation walks the package rule by rule and appends what it
//! produces here: imports, entry points, globals, rule bodies, queries,
//! windows, helper functions, generated auxiliary types and type metadata.
//! The registry is written incrementally, then consumed exactly once by
//! [`render`](PackageRegistry::render), which moves the session from
//! [`SessionState::Building`] to [`SessionState::Emitted`].
//!
//! # Ordering
//!
//! Every name-keyed collection is insertion-ordered. For rules this is a
//! hard semantic invariant (declaration order is implicit evaluation
//! priority); for the rest it buys reproducible output.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::config::{DslFlavor, PackageConfig};
use crate::error::TypeResolutionError;
use crate::resolve::{StaticMember, TypeHandle, TypeResolver};

/// Produces the per-package expression-identifier trace.
///
/// Identifier allocation happens upstream while rule bodies are
/// translated; the assembler only embeds the final trace as a doc comment
/// on the primary unit's rules accessor.
pub trait ExprIdGenerator {
    /// Renders every identifier allocated so far.
    fn trace(&self) -> String;
}

/// Lifecycle of one package-compile session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Artifacts are still being accumulated.
    Building,
    /// The session has been rendered; further renders are a usage error.
    Emitted,
}

/// A query definition record: declared type plus constructor expression.
#[derive(Debug, Clone)]
pub struct QueryDef {
    /// Declared type of the generated definition item.
    pub ty: syn::Type,
    /// Constructor expression initializing it.
    pub ctor: syn::Expr,
}

/// One declared query parameter.
#[derive(Debug, Clone)]
pub struct QueryParam {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: syn::Type,
}

/// Descriptor for an externally registered accumulate function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulateFn {
    /// Full path of the function implementation.
    pub path: String,
}

/// A generated auxiliary type owned by a namespace other than the package.
#[derive(Debug, Clone)]
pub struct NamespacedType {
    /// Namespace the type belongs to.
    pub namespace: String,
    /// The generated item itself.
    pub item: syn::Item,
}

/// Single-use accumulator for every artifact of one package.
///
/// One instance serves one package-compile session, mutated only by the
/// append/put operations below and consumed once by `render`. Sessions are
/// independent; parallel packages share only the read-only resolver and
/// configuration.
pub struct PackageRegistry {
    pub(crate) name: String,
    pub(crate) flavor: DslFlavor,
    pub(crate) config: Arc<PackageConfig>,
    pub(crate) resolver: Arc<dyn TypeResolver>,
    pub(crate) expr_ids: Arc<dyn ExprIdGenerator>,
    pub(crate) state: SessionState,
    pub(crate) imports: IndexSet<String>,
    pub(crate) static_imports: IndexSet<String>,
    pub(crate) entry_points: IndexSet<String>,
    static_members: Option<IndexMap<String, StaticMember>>,
    pub(crate) globals: IndexMap<String, TypeHandle>,
    pub(crate) rules: IndexMap<String, syn::ItemFn>,
    pub(crate) queries: IndexMap<String, syn::ItemFn>,
    pub(crate) query_defs: IndexMap<String, QueryDef>,
    query_params: IndexMap<String, Vec<QueryParam>>,
    pub(crate) windows: IndexMap<String, syn::Expr>,
    pub(crate) functions: Vec<syn::ItemFn>,
    generated_types: Vec<syn::Item>,
    accumulate_types: Vec<NamespacedType>,
    pub(crate) type_metadata: Vec<syn::Expr>,
    accumulate_fns: IndexMap<String, AccumulateFn>,
}

impl PackageRegistry {
    /// Opens a fresh session for `name`.
    pub fn new(
        name: impl Into<String>,
        flavor: DslFlavor,
        config: Arc<PackageConfig>,
        resolver: Arc<dyn TypeResolver>,
        expr_ids: Arc<dyn ExprIdGenerator>,
    ) -> Self {
        Self {
            name: name.into(),
            flavor,
            config,
            resolver,
            expr_ids,
            state: SessionState::Building,
            imports: IndexSet::new(),
            static_imports: IndexSet::new(),
            entry_points: IndexSet::new(),
            static_members: None,
            globals: IndexMap::new(),
            rules: IndexMap::new(),
            queries: IndexMap::new(),
            query_defs: IndexMap::new(),
            query_params: IndexMap::new(),
            windows: IndexMap::new(),
            functions: Vec::new(),
            generated_types: Vec::new(),
            accumulate_types: Vec::new(),
            type_metadata: Vec::new(),
            accumulate_fns: IndexMap::new(),
        }
    }

    /// Package identity carried by every generated unit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generation mode of this package.
    pub fn flavor(&self) -> DslFlavor {
        self.flavor
    }

    /// Shared package-wide configuration.
    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// Current lifecycle state of the session.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Unions plain imports into the package import set.
    pub fn add_imports(&mut self, imports: impl IntoIterator<Item = String>) {
        self.imports.extend(imports);
    }

    /// Unions static imports into the package import set.
    pub fn add_static_imports(&mut self, imports: impl IntoIterator<Item = String>) {
        self.static_imports.extend(imports);
    }

    /// Unions entry-point identifiers into the package entry-point set.
    pub fn add_entry_points(&mut self, ids: impl IntoIterator<Item = String>) {
        self.entry_points.extend(ids);
    }

    /// Resolves and stores global declarations, all or nothing.
    ///
    /// Every type name is resolved before anything is stored, so one
    /// unresolved type aborts the whole update and leaves the registry
    /// unchanged.
    pub fn add_globals(
        &mut self,
        decls: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), TypeResolutionError> {
        let mut resolved = Vec::new();
        for (name, type_name) in decls {
            resolved.push((name, self.resolver.resolve(&type_name)?));
        }
        for (name, handle) in resolved {
            self.globals.insert(name, handle);
        }
        Ok(())
    }

    /// Whether a global with this name has been declared.
    pub fn has_global(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    /// Inserts a rule artifact at the end of the rule order.
    ///
    /// Re-using an existing name overwrites the body in place without
    /// moving its position; declaration order is implicit evaluation
    /// priority and must survive every later transform.
    pub fn put_rule(&mut self, name: impl Into<String>, body: syn::ItemFn) {
        self.rules.insert(name.into(), body);
    }

    /// Inserts a query accessor artifact.
    pub fn put_query(&mut self, name: impl Into<String>, body: syn::ItemFn) {
        self.queries.insert(name.into(), body);
    }

    /// Looks up a query accessor by generated name.
    pub fn query(&self, name: &str) -> Option<&syn::ItemFn> {
        self.queries.get(name)
    }

    /// Inserts a query definition record.
    pub fn put_query_def(&mut self, name: impl Into<String>, def: QueryDef) {
        self.query_defs.insert(name.into(), def);
    }

    /// Appends a parameter to the named query's parameter list.
    pub fn put_query_param(&mut self, query: impl Into<String>, param: QueryParam) {
        self.query_params.entry(query.into()).or_default().push(param);
    }

    /// Parameters declared for the named query, in declaration order.
    pub fn query_params(&self, query: &str) -> Option<&[QueryParam]> {
        self.query_params.get(query).map(Vec::as_slice)
    }

    /// Inserts a window declaration.
    pub fn put_window(&mut self, name: impl Into<String>, init: syn::Expr) {
        self.windows.insert(name.into(), init);
    }

    /// Appends helper functions emitted into the primary unit.
    pub fn add_functions(&mut self, functions: impl IntoIterator<Item = syn::ItemFn>) {
        self.functions.extend(functions);
    }

    /// Appends a generated auxiliary type.
    pub fn add_generated_type(&mut self, item: syn::Item) {
        self.generated_types.push(item);
    }

    /// Generated auxiliary types, in append order.
    pub fn generated_types(&self) -> &[syn::Item] {
        &self.generated_types
    }

    /// Appends a generated accumulate type with its owning namespace.
    pub fn add_accumulate_type(&mut self, ty: NamespacedType) {
        self.accumulate_types.push(ty);
    }

    /// Generated accumulate types, in append order.
    pub fn accumulate_types(&self) -> &[NamespacedType] {
        &self.accumulate_types
    }

    /// Appends a type-metadata expression.
    pub fn add_type_metadata(&mut self, expr: syn::Expr) {
        self.type_metadata.push(expr);
    }

    /// Replaces the accumulate-function table wholesale.
    pub fn register_accumulate_functions(&mut self, map: IndexMap<String, AccumulateFn>) {
        self.accumulate_fns = map;
    }

    /// The externally supplied accumulate-function table.
    pub fn accumulate_functions(&self) -> &IndexMap<String, AccumulateFn> {
        &self.accumulate_fns
    }

    /// Resolves a statically imported member by bare name.
    ///
    /// The first call walks every static import and builds a name table:
    /// wildcard imports (`Type::*`) contribute all public static members of
    /// `Type`, with later entries silently overwriting earlier ones on name
    /// collision; explicit imports (`Type::member`) contribute the first
    /// matching member. The table is built at most once per session. Any
    /// unresolved type aborts the build.
    pub fn resolve_static_method(
        &mut self,
        name: &str,
    ) -> Result<Option<&StaticMember>, TypeResolutionError> {
        if self.static_members.is_none() {
            let table = build_static_table(&self.static_imports, self.resolver.as_ref())?;
            self.static_members = Some(table);
        }
        Ok(self.static_members.as_ref().and_then(|t| t.get(name)))
    }

    /// Debug-logs one rule's generated source.
    pub fn log_rule(&self, source: &str) {
        debug!(package = %self.name, "=====\n{source}\n=====");
    }
}

fn build_static_table(
    static_imports: &IndexSet<String>,
    resolver: &dyn TypeResolver,
) -> Result<IndexMap<String, StaticMember>, TypeResolutionError> {
    let mut table = IndexMap::new();
    for import in static_imports {
        if let Some(type_name) = import.strip_suffix("::*") {
            let handle = resolver.resolve(type_name)?;
            for member in handle.static_members() {
                table.insert(member.name.clone(), member.clone());
            }
        } else if let Some((type_name, member_name)) = import.rsplit_once("::") {
            let handle = resolver.resolve(type_name)?;
            if let Some(member) = handle
                .static_members()
                .iter()
                .find(|m| m.name == member_name)
            {
                table.insert(member.name.clone(), member.clone());
            }
        }
    }
    Ok(table)
}
