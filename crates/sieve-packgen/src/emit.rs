// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Emission engine.
//!
//! Consumes a finished [`PackageRegistry`] once and renders it into one
//! primary unit plus zero or more secondary units. The primary unit
//! implements the package-model contract (`name`, `rules`, `entry_points`,
//! `globals`, `queries`, `type_meta_datas`); secondary units are either
//! method holders (rule bodies, hosted in groups to bound per-unit size)
//! or rule-list chunks (bulk-appendable slices of the rule order).
//!
//! Units are assembled as `syn` syntax trees and printed with
//! `prettyplease`, never by string concatenation.
//!
//! # Ordering
//!
//! Rule accessor calls are appended in declaration order to whichever
//! list currently owns them, so concatenating the primary list with every
//! chunk list in chunk order reproduces the original rule sequence
//! exactly. All other item groups emit in insertion order.

use indexmap::IndexSet;
use proc_macro2::Literal;
use syn::parse_quote;
use tracing::info;

use crate::error::{ArtifactKind, PackError};
use crate::imports::{self, ImportEnv};
use crate::naming;
use crate::registry::{PackageRegistry, SessionState};
use crate::split::SplitPlan;

/// One generated source unit: its name (also its module name) and the
/// rendered Rust source text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    /// Unit name, unique within the package.
    pub name: String,
    /// Rendered source text.
    pub source: String,
}

/// Result set of one package emission.
///
/// `secondary` is an unordered bag; downstream must compile and link every
/// unit together with the primary before instantiating the model type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderedPackage {
    /// The unit implementing the package-model contract.
    pub primary: Unit,
    /// Method-holder and rule-list chunk units.
    pub secondary: Vec<Unit>,
}

struct HolderDraft {
    name: String,
    items: Vec<syn::Item>,
}

struct ChunkDraft {
    name: String,
    calls: Vec<syn::Expr>,
}

impl PackageRegistry {
    /// Renders the session into its result set.
    ///
    /// Valid exactly once per session. A second call fails with
    /// [`PackError::AlreadyEmitted`] and leaves the first result
    /// untouched.
    pub fn render(&mut self) -> Result<RenderedPackage, PackError> {
        if self.state == SessionState::Emitted {
            return Err(PackError::AlreadyEmitted {
                package: self.name.clone(),
            });
        }
        let rendered = self.render_units()?;
        self.state = SessionState::Emitted;
        info!(
            package = %self.name,
            rules = self.rules.len(),
            units = rendered.secondary.len() + 1,
            "rendered package"
        );
        Ok(rendered)
    }

    fn render_units(&self) -> Result<RenderedPackage, PackError> {
        let tag = naming::unit_tag(&self.name);
        let primary_name = format!("rules_{tag}");
        let model_ident = naming::ident(&format!("Rules{tag}"))?;
        let package = self.name.as_str();

        let env = ImportEnv {
            flavor: self.flavor,
            package,
            imports: &self.imports,
            static_imports: &self.static_imports,
        };

        let mut used = IndexSet::new();
        let mut items: Vec<syn::Item> = Vec::new();

        // Fixed head: date-format constant and parsing helper.
        let mask = self.config.date_format.as_str();
        items.push(parse_quote! {
            /// Date-format mask applied to date literals in this package.
            pub const DATE_FORMAT: &str = #mask;
        });
        items.push(parse_quote! {
            /// Parses a date literal using [`DATE_FORMAT`].
            pub fn string_to_date(s: &str) -> NaiveDateTime {
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .expect("date literal")
                    .and_time(NaiveTime::MIN)
            }
        });

        // One item per window, global, query definition and query, each
        // under a collision-checked generated identifier.
        for (name, init) in &self.windows {
            claim(&mut used, ArtifactKind::Window, name, name)?;
            let id = naming::ident(name)?;
            let doc = format!(" Window reference `{name}`.");
            items.push(parse_quote! {
                #[doc = #doc]
                pub fn #id() -> WindowReference { #init }
            });
        }

        let mut global_idents = Vec::new();
        for (name, handle) in &self.globals {
            let mangled = naming::mangle_global(name);
            claim(&mut used, ArtifactKind::Global, name, &mangled)?;
            let id = naming::ident(&mangled)?;
            let element_ty: syn::Type =
                syn::parse_str(handle.path()).map_err(|_| PackError::Render {
                    detail: format!("global `{name}` has unparseable type `{}`", handle.path()),
                })?;
            items.push(global_field(package, name, &id, &element_ty));
            global_idents.push(id);
        }

        for (name, def) in &self.query_defs {
            claim(&mut used, ArtifactKind::QueryDef, name, name)?;
            let id = naming::ident(name)?;
            let ty = &def.ty;
            let ctor = &def.ctor;
            let doc = format!(" Query definition `{name}`.");
            items.push(parse_quote! {
                #[doc = #doc]
                pub fn #id() -> #ty { #ctor }
            });
        }

        let mut query_idents = Vec::new();
        for (name, body) in &self.queries {
            claim(&mut used, ArtifactKind::Query, name, name)?;
            query_idents.push(naming::ident(name)?);
            items.push(syn::Item::Fn(body.clone()));
        }

        for function in &self.functions {
            items.push(syn::Item::Fn(function.clone()));
        }

        // Distribute rule bodies into holders and accessor calls into the
        // primary list or the chunk that currently owns the tail of the
        // rule order.
        let plan = SplitPlan::new(
            self.rules.len(),
            self.config.rules_per_holder,
            self.config.rules_per_chunk,
        );
        let mut holders: Vec<HolderDraft> = Vec::new();
        let mut chunks: Vec<ChunkDraft> = Vec::new();
        let mut primary_calls: Vec<syn::Expr> = Vec::new();

        for (index, (rule_name, body)) in self.rules.iter().enumerate() {
            let holder_index = plan.holder_of(index);
            if holder_index == holders.len() {
                holders.push(HolderDraft {
                    name: format!("{primary_name}_fns_{holder_index}"),
                    items: Vec::new(),
                });
            }
            holders[holder_index].items.push(syn::Item::Fn(body.clone()));

            if plan.crosses_chunk(index) {
                let chunk_index = chunks.len();
                chunks.push(ChunkDraft {
                    name: format!("{primary_name}_list_{chunk_index}"),
                    calls: Vec::new(),
                });
            }

            let holder_mod = naming::ident(&holders[holder_index].name)?;
            let rule_ident = naming::ident(rule_name)?;
            let call: syn::Expr = parse_quote!(super::#holder_mod::#rule_ident());
            match chunks.last_mut() {
                Some(chunk) => chunk.calls.push(call),
                None => primary_calls.push(call),
            }
        }

        items.push(rule_list_item(&primary_calls));
        items.push(parse_quote! {
            /// Generated model type for this package.
            pub struct #model_ident;
        });
        items.push(self.rules_accessor(&model_ident, &plan, &chunks)?);
        items.push(self.model_impl(&model_ident, &global_idents, &query_idents));

        // Print everything.
        let primary_doc = unit_doc(package, "package model");
        let primary = print_unit(
            primary_name.clone(),
            &primary_doc,
            imports::primary_imports(&env)?,
            items,
        );

        let mut secondary = Vec::with_capacity(holders.len() + chunks.len());
        for holder in holders {
            let doc = unit_doc(package, "rule bodies");
            let uses = imports::holder_imports(&env, &primary_name)?;
            secondary.push(print_unit(holder.name, &doc, uses, holder.items));
        }
        for chunk in chunks {
            let doc = unit_doc(package, "rule list");
            let uses = imports::chunk_imports()?;
            secondary.push(print_unit(
                chunk.name,
                &doc,
                uses,
                vec![rule_list_item(&chunk.calls)],
            ));
        }

        Ok(RenderedPackage { primary, secondary })
    }

    fn rules_accessor(
        &self,
        model_ident: &syn::Ident,
        plan: &SplitPlan,
        chunks: &[ChunkDraft],
    ) -> Result<syn::Item, PackError> {
        let mut trace_docs = vec![" Expression identifier trace:".to_owned()];
        for line in self.expr_ids.trace().lines() {
            trace_docs.push(format!(" {line}"));
        }

        let rules_fn: syn::ImplItemFn = if plan.chunked() {
            let cap = Literal::usize_unsuffixed(plan.rule_count());
            let mut chunk_mods = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                chunk_mods.push(naming::ident(&chunk.name)?);
            }
            parse_quote! {
                #(#[doc = #trace_docs])*
                pub fn rules() -> Vec<Rule> {
                    let mut rules = Vec::with_capacity(#cap);
                    rules.extend(rule_list());
                    #(rules.extend(super::#chunk_mods::rule_list());)*
                    rules
                }
            }
        } else {
            parse_quote! {
                #(#[doc = #trace_docs])*
                pub fn rules() -> Vec<Rule> {
                    rule_list()
                }
            }
        };

        Ok(parse_quote! {
            impl #model_ident {
                #rules_fn
            }
        })
    }

    fn model_impl(
        &self,
        model_ident: &syn::Ident,
        global_idents: &[syn::Ident],
        query_idents: &[syn::Ident],
    ) -> syn::Item {
        let package = self.name.as_str();

        let entry_points: syn::Expr = if self.entry_points.is_empty() {
            parse_quote!(Vec::new())
        } else {
            let ids = self.entry_points.iter();
            parse_quote!(vec![#(d::entry_point(#ids)),*])
        };
        let globals: syn::Expr = if global_idents.is_empty() {
            parse_quote!(Vec::new())
        } else {
            parse_quote!(vec![#(#global_idents().erased()),*])
        };
        let queries: syn::Expr = if query_idents.is_empty() {
            parse_quote!(Vec::new())
        } else {
            parse_quote!(vec![#(#query_idents()),*])
        };
        let metadata: syn::Expr = if self.type_metadata.is_empty() {
            parse_quote!(Vec::new())
        } else {
            let exprs = self.type_metadata.iter();
            parse_quote!(vec![#(#exprs),*])
        };

        parse_quote! {
            impl Model for #model_ident {
                fn name(&self) -> &str {
                    #package
                }
                fn rules(&self) -> Vec<Rule> {
                    Self::rules()
                }
                fn entry_points(&self) -> Vec<EntryPoint> {
                    #entry_points
                }
                fn globals(&self) -> Vec<GlobalRef> {
                    #globals
                }
                fn queries(&self) -> Vec<Query> {
                    #queries
                }
                fn type_meta_datas(&self) -> Vec<TypeMetaData> {
                    #metadata
                }
            }
        }
    }
}

/// Emits one package-scoped global slot: a generic global reference
/// parameterized by the element type, constructed from the element type,
/// the package name and the raw global name.
fn global_field(
    package: &str,
    raw_name: &str,
    mangled: &syn::Ident,
    element_ty: &syn::Type,
) -> syn::Item {
    let doc = format!(" Package-scoped global `{raw_name}`.");
    parse_quote! {
        #[doc = #doc]
        pub fn #mangled() -> Global<#element_ty> {
            global_of::<#element_ty>(#package, #raw_name)
        }
    }
}

fn rule_list_item(calls: &[syn::Expr]) -> syn::Item {
    parse_quote! {
        /// Ordered rule list owned by this unit.
        pub fn rule_list() -> Vec<Rule> {
            vec![#(#calls),*]
        }
    }
}

fn claim(
    used: &mut IndexSet<String>,
    kind: ArtifactKind,
    raw: &str,
    ident: &str,
) -> Result<(), PackError> {
    if used.insert(ident.to_owned()) {
        Ok(())
    } else {
        Err(PackError::DuplicateArtifact {
            kind,
            name: raw.to_owned(),
        })
    }
}

fn unit_doc(package: &str, role: &str) -> String {
    format!("//! Generated {role} for package `{package}`. Do not edit.\n")
}

fn print_unit(name: String, doc: &str, uses: Vec<syn::ItemUse>, items: Vec<syn::Item>) -> Unit {
    let mut all: Vec<syn::Item> = uses.into_iter().map(syn::Item::Use).collect();
    all.extend(items);
    let file = syn::File {
        shebang: None,
        attrs: Vec::new(),
        items: all,
    };
    let source = format!("{doc}{}", prettyplease::unparse(&file));
    Unit { name, source }
}
