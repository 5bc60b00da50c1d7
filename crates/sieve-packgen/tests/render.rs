// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end emission tests.
//!
//! These tests populate a registry the way the upstream rule translator
//! would, render it, and assert on the generated source text. Generated
//! units must always parse as valid Rust.

use std::sync::Arc;

use quote::format_ident;
use sieve_packgen::{
    ArtifactKind, DslFlavor, ExprIdGenerator, PackError, PackageConfig, PackageRegistry, QueryDef,
    RenderedPackage, TypeHandle, TypeResolutionError, TypeResolver,
};
use syn::parse_quote;

struct MapResolver(Vec<(&'static str, TypeHandle)>);

impl TypeResolver for MapResolver {
    fn resolve(&self, name: &str) -> Result<TypeHandle, TypeResolutionError> {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, h)| h.clone())
            .ok_or_else(|| TypeResolutionError { name: name.into() })
    }
}

struct TraceIds(&'static str);

impl ExprIdGenerator for TraceIds {
    fn trace(&self) -> String {
        self.0.to_owned()
    }
}

fn registry(config: PackageConfig) -> PackageRegistry {
    PackageRegistry::new(
        "com::example",
        DslFlavor::Pattern,
        Arc::new(config),
        Arc::new(MapResolver(vec![
            ("i64", TypeHandle::new("i64")),
            ("acme::Stock", TypeHandle::new("acme::Stock")),
        ])),
        Arc::new(TraceIds("")),
    )
}

fn rule_fn(name: &str) -> syn::ItemFn {
    let ident = format_ident!("{name}");
    parse_quote! {
        pub fn #ident() -> Rule {
            d::rule(#name).build()
        }
    }
}

fn add_rules(reg: &mut PackageRegistry, count: usize) {
    for i in 0..count {
        let name = format!("rule_{i}");
        reg.put_rule(name.clone(), rule_fn(&name));
    }
}

/// Verify generated code parses as valid Rust using syn.
fn assert_valid_rust(unit_name: &str, code: &str) {
    syn::parse_file(code).unwrap_or_else(|e| {
        panic!("unit `{unit_name}` is not valid Rust:\n{code}\n\nError: {e}")
    });
}

fn assert_all_valid(rendered: &RenderedPackage) {
    assert_valid_rust(&rendered.primary.name, &rendered.primary.source);
    for unit in &rendered.secondary {
        assert_valid_rust(&unit.name, &unit.source);
    }
}

/// Whitespace-insensitive containment, robust against line wrapping.
fn flat(s: &str) -> String {
    s.split_whitespace().collect()
}

fn assert_contains(source: &str, pat: &str) {
    assert!(
        flat(source).contains(&flat(pat)),
        "expected `{pat}` in:\n{source}"
    );
}

fn position(source: &str, pat: &str) -> usize {
    flat(source)
        .find(&flat(pat))
        .unwrap_or_else(|| panic!("expected `{pat}` in:\n{source}"))
}

// ─── Example Scenario ────────────────────────────────────────────────────────

#[test]
fn three_rules_one_global_yields_one_holder() {
    let mut reg = registry(PackageConfig::default());
    for name in ["rule_r1", "rule_r2", "rule_r3"] {
        reg.put_rule(name, rule_fn(name));
    }
    reg.add_globals(vec![("counter".to_owned(), "i64".to_owned())])
        .unwrap();

    let rendered = reg.render().unwrap();
    assert_all_valid(&rendered);

    // 3 rules with holder size 5: exactly one method-holder, no chunks.
    assert_eq!(rendered.secondary.len(), 1);
    let holder = &rendered.secondary[0];
    assert_eq!(holder.name, format!("{}_fns_0", rendered.primary.name));
    assert!(!rendered.secondary.iter().any(|u| u.name.contains("_list_")));

    // Accessor calls appear in declaration order.
    let primary = &rendered.primary.source;
    let holder_mod = &holder.name;
    let r1 = position(primary, &format!("super::{holder_mod}::rule_r1()"));
    let r2 = position(primary, &format!("super::{holder_mod}::rule_r2()"));
    let r3 = position(primary, &format!("super::{holder_mod}::rule_r3()"));
    assert!(r1 < r2 && r2 < r3);

    // Rule bodies live in the holder, not the primary.
    assert_contains(&holder.source, "pub fn rule_r1() -> Rule");
    assert!(!flat(primary).contains(&flat("pub fn rule_r1() -> Rule")));

    // Exactly one global slot, parameterized by the element type.
    assert_contains(primary, "pub fn var_counter() -> Global<i64>");
    assert_contains(
        primary,
        r#"global_of::<i64>("com::example", "counter")"#,
    );
    assert_eq!(flat(primary).matches(&flat("global_of::<")).count(), 1);
    assert_contains(primary, "vec![var_counter().erased()]");

    // Model contract surface.
    assert_contains(primary, r#"fn name(&self) -> &str { "com::example" }"#);
    assert_contains(primary, "fn type_meta_datas(&self) -> Vec<TypeMetaData> { Vec::new() }");
}

// ─── Method Holders ──────────────────────────────────────────────────────────

#[test]
fn holder_count_is_ceil_of_rule_count_over_five() {
    let mut reg = registry(PackageConfig::default());
    add_rules(&mut reg, 12);
    let rendered = reg.render().unwrap();
    assert_all_valid(&rendered);

    let holders: Vec<&str> = rendered
        .secondary
        .iter()
        .filter(|u| u.name.contains("_fns_"))
        .map(|u| u.name.as_str())
        .collect();
    assert_eq!(holders.len(), 3);

    // Rule 5 lands in the second holder.
    let second = rendered
        .secondary
        .iter()
        .find(|u| u.name.ends_with("_fns_1"))
        .unwrap();
    assert_contains(&second.source, "pub fn rule_5() -> Rule");
    assert_contains(
        &rendered.primary.source,
        &format!("super::{}_fns_1::rule_5()", rendered.primary.name),
    );
}

#[test]
fn zero_rules_yield_zero_secondary_units() {
    let mut reg = registry(PackageConfig::default());
    let rendered = reg.render().unwrap();
    assert_all_valid(&rendered);
    assert!(rendered.secondary.is_empty());
    assert_contains(&rendered.primary.source, "pub fn rule_list() -> Vec<Rule>");
}

// ─── Chunking ────────────────────────────────────────────────────────────────

#[test]
fn small_thresholds_split_rules_across_a_chunk_boundary() {
    let config = PackageConfig {
        rules_per_holder: 2,
        rules_per_chunk: 4,
        ..PackageConfig::default()
    };
    let mut reg = registry(config);
    add_rules(&mut reg, 5);
    let rendered = reg.render().unwrap();
    assert_all_valid(&rendered);

    // ceil(5 / 2) = 3 holders plus one chunk opened at index 3.
    let primary_name = &rendered.primary.name;
    assert_eq!(rendered.secondary.len(), 4);
    let chunk = rendered
        .secondary
        .iter()
        .find(|u| u.name == format!("{primary_name}_list_0"))
        .unwrap();

    // Primary owns rules 0..=2, the chunk owns rules 3 and 4.
    let primary = &rendered.primary.source;
    assert_contains(primary, &format!("super::{primary_name}_fns_1::rule_2()"));
    assert!(!flat(primary).contains(&flat("rule_3()")));
    let c3 = position(&chunk.source, &format!("super::{primary_name}_fns_1::rule_3()"));
    let c4 = position(&chunk.source, &format!("super::{primary_name}_fns_2::rule_4()"));
    assert!(c3 < c4);

    // Holder 1 straddles the chunk boundary: rule_2 stays in the primary
    // list while rule_3 opens the chunk, both hosted by `_fns_1`.
    let straddler = rendered
        .secondary
        .iter()
        .find(|u| u.name.ends_with("_fns_1"))
        .unwrap();
    assert_contains(&straddler.source, "pub fn rule_2() -> Rule");
    assert_contains(&straddler.source, "pub fn rule_3() -> Rule");

    // The primary assembles via one bulk append per chunk.
    assert_contains(primary, "let mut rules = Vec::with_capacity(5)");
    assert_contains(primary, "rules.extend(rule_list());");
    assert_contains(
        primary,
        &format!("rules.extend(super::{primary_name}_list_0::rule_list());"),
    );
}

#[test]
fn nine_hundred_ninety_nine_rules_produce_no_chunk_unit() {
    let mut reg = registry(PackageConfig::default());
    add_rules(&mut reg, 999);
    let rendered = reg.render().unwrap();

    assert!(!rendered.secondary.iter().any(|u| u.name.contains("_list_")));
    assert_eq!(
        rendered
            .secondary
            .iter()
            .filter(|u| u.name.contains("_fns_"))
            .count(),
        200
    );
    // The list is pre-sized but still assembled from the primary alone.
    let primary = &rendered.primary.source;
    assert_contains(primary, "Vec::with_capacity(999)");
    assert_eq!(flat(primary).matches(&flat("rules.extend(")).count(), 1);
}

#[test]
fn one_thousand_rules_produce_exactly_one_chunk_unit() {
    let mut reg = registry(PackageConfig::default());
    add_rules(&mut reg, 1000);
    let rendered = reg.render().unwrap();

    let chunks: Vec<_> = rendered
        .secondary
        .iter()
        .filter(|u| u.name.contains("_list_"))
        .collect();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].name, format!("{}_list_0", rendered.primary.name));

    // The boundary rule (index 999) opens the chunk; everything before it
    // stays in the primary list.
    assert_contains(&chunks[0].source, "rule_999()");
    assert!(!flat(&chunks[0].source).contains(&flat("rule_998()")));
    let primary = &rendered.primary.source;
    assert_contains(primary, "rule_998()");
    assert!(!flat(primary).contains(&flat("rule_999()")));

    // One bulk append for the chunk, one for the primary's own list.
    assert_eq!(flat(primary).matches(&flat("rules.extend(")).count(), 2);
    assert_valid_rust(&chunks[0].name, &chunks[0].source);
}

// ─── Imports ─────────────────────────────────────────────────────────────────

#[test]
fn self_wildcard_import_is_stripped_everywhere() {
    let mut reg = registry(PackageConfig::default());
    reg.add_imports(vec![
        "com::example::*".to_owned(),
        "acme::facts::*".to_owned(),
    ]);
    add_rules(&mut reg, 1);
    let rendered = reg.render().unwrap();
    assert_all_valid(&rendered);

    for unit in std::iter::once(&rendered.primary).chain(&rendered.secondary) {
        assert!(
            !flat(&unit.source).contains(&flat("use com::example::*;")),
            "self import leaked into `{}`",
            unit.name
        );
    }
    assert_contains(&rendered.primary.source, "use acme::facts::*;");
    assert_contains(&rendered.secondary[0].source, "use acme::facts::*;");
}

#[test]
fn holders_import_the_primary_and_chunks_only_the_prelude() {
    let config = PackageConfig {
        rules_per_holder: 2,
        rules_per_chunk: 4,
        ..PackageConfig::default()
    };
    let mut reg = registry(config);
    reg.add_imports(vec!["acme::facts::*".to_owned()]);
    add_rules(&mut reg, 5);
    let rendered = reg.render().unwrap();

    let primary_name = &rendered.primary.name;
    let holder = rendered
        .secondary
        .iter()
        .find(|u| u.name.ends_with("_fns_0"))
        .unwrap();
    assert_contains(&holder.source, &format!("use super::{primary_name}::*;"));

    let chunk = rendered
        .secondary
        .iter()
        .find(|u| u.name.ends_with("_list_0"))
        .unwrap();
    assert_contains(&chunk.source, "use sieve_rt::prelude::*;");
    assert!(!flat(&chunk.source).contains(&flat("use acme::facts::*;")));
}

#[test]
fn flow_flavor_binds_the_flow_dsl() {
    let mut reg = PackageRegistry::new(
        "com::example",
        DslFlavor::Flow,
        Arc::new(PackageConfig::default()),
        Arc::new(MapResolver(Vec::new())),
        Arc::new(TraceIds("")),
    );
    let rendered = reg.render().unwrap();
    assert_contains(&rendered.primary.source, "use sieve_rt::dsl::flow as d;");
}

// ─── Duplicates & Lifecycle ──────────────────────────────────────────────────

#[test]
fn colliding_global_mangles_fail_emission() {
    let mut reg = registry(PackageConfig::default());
    reg.add_globals(vec![
        ("stock.level".to_owned(), "i64".to_owned()),
        ("stock_level".to_owned(), "i64".to_owned()),
    ])
    .unwrap();

    match reg.render() {
        Err(PackError::DuplicateArtifact { kind, name }) => {
            assert_eq!(kind, ArtifactKind::Global);
            assert_eq!(name, "stock_level");
        }
        other => panic!("expected DuplicateArtifact, got {other:?}"),
    }
}

#[test]
fn second_render_fails_and_leaves_the_first_result_intact() {
    let mut reg = registry(PackageConfig::default());
    add_rules(&mut reg, 3);
    let first = reg.render().unwrap();

    match reg.render() {
        Err(PackError::AlreadyEmitted { package }) => assert_eq!(package, "com::example"),
        other => panic!("expected AlreadyEmitted, got {other:?}"),
    }
    assert_eq!(first.secondary.len(), 1);
    assert_contains(&first.primary.source, "pub fn rules() -> Vec<Rule>");
}

// ─── Entry Points, Windows, Queries, Metadata ────────────────────────────────

#[test]
fn declaration_groups_emit_into_the_primary_unit() {
    let mut reg = registry(PackageConfig::default());
    reg.add_entry_points(vec!["order-stream".to_owned(), "audit".to_owned()]);
    reg.put_window("wnd_ticks", parse_quote!(d::window(Stock::by_ticker(), 64)));
    reg.put_query_def(
        "qdef_find_stock",
        QueryDef {
            ty: parse_quote!(QueryDef1<acme::Stock>),
            ctor: parse_quote!(d::query("com::example", "find_stock")),
        },
    );
    reg.put_query(
        "query_find_stock",
        parse_quote! {
            pub fn query_find_stock() -> Query {
                qdef_find_stock().build()
            }
        },
    );
    reg.add_type_metadata(parse_quote!(type_meta::<acme::Stock>()));

    let rendered = reg.render().unwrap();
    assert_all_valid(&rendered);
    let primary = &rendered.primary.source;

    assert_contains(
        primary,
        r#"vec![d::entry_point("order-stream"), d::entry_point("audit")]"#,
    );
    assert_contains(primary, "pub fn wnd_ticks() -> WindowReference");
    assert_contains(primary, "pub fn qdef_find_stock() -> QueryDef1<acme::Stock>");
    assert_contains(primary, "fn queries(&self) -> Vec<Query> { vec![query_find_stock()] }");
    assert_contains(primary, "vec![type_meta::<acme::Stock>()]");
}

#[test]
fn expression_trace_lands_on_the_rules_accessor() {
    let mut reg = PackageRegistry::new(
        "com::example",
        DslFlavor::Pattern,
        Arc::new(PackageConfig::default()),
        Arc::new(MapResolver(Vec::new())),
        Arc::new(TraceIds("E17: price > threshold")),
    );
    add_rules(&mut reg, 1);
    let rendered = reg.render().unwrap();
    let primary = &rendered.primary.source;
    assert!(primary.contains("Expression identifier trace:"));
    assert!(primary.contains("E17: price > threshold"));
}

#[test]
fn rule_overwrite_keeps_declaration_order() {
    let mut reg = registry(PackageConfig::default());
    reg.put_rule("rule_a", rule_fn("rule_a"));
    reg.put_rule("rule_b", rule_fn("rule_b"));
    // Re-inserting rule_a replaces the body without moving it forward.
    reg.put_rule(
        "rule_a",
        parse_quote! {
            pub fn rule_a() -> Rule {
                d::rule("rule_a").salience(10).build()
            }
        },
    );
    let rendered = reg.render().unwrap();
    let primary = &rendered.primary.source;
    let a = position(primary, "rule_a()");
    let b = position(primary, "rule_b()");
    assert!(a < b);
    assert_contains(&rendered.secondary[0].source, "salience(10)");
}
