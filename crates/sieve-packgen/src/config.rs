// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Package-wide configuration shared read-only across compile sessions.

/// Which rule-DSL namespace generated units bind as `d`.
///
/// Pattern-style packages import `sieve_rt::dsl::pattern`, flow-style
/// packages import `sieve_rt::dsl::flow`. The flag is fixed per package
/// for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DslFlavor {
    /// Pattern-style DSL generation.
    Pattern,
    /// Flow-style DSL generation.
    Flow,
}

/// Knobs that shape emission for every package compiled in one session
/// group. Immutable once constructed; share it via `Arc` across parallel
/// package sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackageConfig {
    /// `chrono` format mask applied to date literals in generated units.
    pub date_format: String,
    /// Rule bodies hosted per method-holder unit.
    pub rules_per_holder: usize,
    /// Rule accessors listed per rule-list chunk unit.
    pub rules_per_chunk: usize,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            date_format: "%d-%b-%Y".to_owned(),
            rules_per_holder: 5,
            rules_per_chunk: 1000,
        }
    }
}
