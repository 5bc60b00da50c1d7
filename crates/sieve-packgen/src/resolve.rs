// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type resolution seam.
//!
//! The assembler never loads types itself. Callers inject a [`TypeResolver`]
//! and the registry asks it for a [`TypeHandle`] whenever a global
//! declaration or a static import names a type. Resolution is synchronous,
//! side-effect free, and total: a handle comes back or the lookup fails
//! with [`TypeResolutionError`].

use crate::error::TypeResolutionError;

/// Resolves type names against whatever type universe the host compiler
/// provides.
///
/// Implementations may cache freely. They are shared read-only across
/// parallel package sessions, so implementors decide their own thread
/// safety story.
pub trait TypeResolver {
    /// Looks up `name` and returns its handle.
    fn resolve(&self, name: &str) -> Result<TypeHandle, TypeResolutionError>;
}

/// A resolved type: its canonical path plus the public static members a
/// wildcard static import would pull in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHandle {
    path: String,
    statics: Vec<StaticMember>,
}

impl TypeHandle {
    /// Handle for a type with no interesting static surface.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            statics: Vec::new(),
        }
    }

    /// Handle carrying the type's public static members.
    pub fn with_statics(path: impl Into<String>, statics: Vec<StaticMember>) -> Self {
        Self {
            path: path.into(),
            statics,
        }
    }

    /// Canonical path of the resolved type, parseable as a Rust type.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Public static members of the type, in declaration order.
    pub fn static_members(&self) -> &[StaticMember] {
        &self.statics
    }
}

/// One callable static member of a resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMember {
    /// Bare member name, the key static imports resolve by.
    pub name: String,
    /// Full path rule bodies use to call the member.
    pub path: String,
}

impl StaticMember {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}
