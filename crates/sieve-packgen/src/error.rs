// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for package assembly and emission.
//!
//! Every error here is terminal for the current package compile. Recovery
//! (for example skipping one bad rule) happens upstream, before artifacts
//! reach the registry.

use std::fmt;

/// A referenced type could not be found by the injected resolver.
///
/// Raised eagerly by [`crate::PackageRegistry::add_globals`] and by
/// static-import resolution. One unresolved type aborts the whole
/// registry update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[TYPE_UNRESOLVED] cannot resolve type `{name}`")]
pub struct TypeResolutionError {
    /// The type name that failed to resolve.
    pub name: String,
}

/// Artifact categories named in duplicate diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A window declaration.
    Window,
    /// A package-scoped global.
    Global,
    /// A query definition record.
    QueryDef,
    /// A query accessor.
    Query,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Window => "window",
            Self::Global => "global",
            Self::QueryDef => "query definition",
            Self::Query => "query",
        };
        f.write_str(label)
    }
}

/// Errors raised while assembling or rendering one package.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackError {
    /// Global or static-import type resolution failed.
    #[error(transparent)]
    TypeResolution(#[from] TypeResolutionError),

    /// Two distinct declarations claimed the same generated identifier.
    #[error("[DUPLICATE_ARTIFACT] {kind} `{name}` collides with an existing generated identifier")]
    DuplicateArtifact {
        /// Category of the offending artifact.
        kind: ArtifactKind,
        /// Raw declaration name as supplied upstream.
        name: String,
    },

    /// The session was rendered a second time.
    ///
    /// The result of the first render is unaffected.
    #[error("[ALREADY_EMITTED] package `{package}` has already been rendered")]
    AlreadyEmitted {
        /// Name of the package whose session was already consumed.
        package: String,
    },

    /// A stored path or name could not be turned into generated syntax.
    ///
    /// Covers malformed import paths, unparseable type paths, and artifact
    /// names that are not valid identifiers.
    #[error("[RENDER] {detail}")]
    Render {
        /// Human-readable description of the offending input.
        detail: String,
    },
}
