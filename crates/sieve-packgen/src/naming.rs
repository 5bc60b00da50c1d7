// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Generated-name derivation.
//!
//! Two naming concerns live here: mangling raw declaration names into
//! collision-safe item identifiers, and deriving the per-package unit tag
//! that every emitted unit name hangs off. Both transforms are
//! deterministic: same input, same output, always.

use blake3::Hasher;

use crate::error::PackError;

/// Prefix for mangled global field identifiers.
///
/// Reserved: raw declaration names never start generated items with this
/// prefix themselves, which keeps mangled globals clear of windows, query
/// definitions and query accessors emitted under their raw names.
pub(crate) const GLOBAL_PREFIX: &str = "var_";

/// Mangles a raw global name into a generated item identifier.
///
/// Alphanumerics pass through, everything else becomes `_`. Distinct raw
/// names may mangle to the same identifier (`a.b` and `a_b` both yield
/// `var_a_b`); emission rejects such collisions rather than silently
/// merging slots.
pub(crate) fn mangle_global(name: &str) -> String {
    let mut out = String::with_capacity(GLOBAL_PREFIX.len() + name.len());
    out.push_str(GLOBAL_PREFIX);
    for ch in name.chars() {
        out.push(if ch.is_ascii_alphanumeric() { ch } else { '_' });
    }
    out
}

/// Derives the 8-hex-char tag that namespaces one package's units.
///
/// Domain-separated BLAKE3 over the package name (`b"unit:" || name`), so
/// tags are stable across runs and distinct packages get distinct tags.
pub(crate) fn unit_tag(package: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"unit:");
    hasher.update(package.as_bytes());
    let digest = hasher.finalize();
    let mut tag = String::with_capacity(8);
    for byte in &digest.as_bytes()[..4] {
        tag.push_str(&format!("{byte:02x}"));
    }
    tag
}

/// Parses `name` as a generated-item identifier.
pub(crate) fn ident(name: &str) -> Result<syn::Ident, PackError> {
    syn::parse_str(name).map_err(|_| PackError::Render {
        detail: format!("`{name}` is not a valid generated identifier"),
    })
}
