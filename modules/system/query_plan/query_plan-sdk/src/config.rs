//! Configuration for the query plan compiler.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::pep::compiler::PlanCompiler;
use crate::resolver::FieldMap;

/// What the compiler does with operators and node shapes it cannot translate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOperatorPolicy {
    /// Contribute no constraint for the node and log a warning. The
    /// resulting filter may admit more rows than the policy intends.
    #[default]
    Skip,
    /// Fail the compile call (fail-closed).
    Reject,
}

/// Compiler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Handling of unsupported operators and malformed nodes.
    pub unknown_operators: UnknownOperatorPolicy,

    /// Static mapping from plan variable path to store field name.
    pub field_names: BTreeMap<String, String>,

    /// Reject variable paths missing from `field_names` instead of using
    /// the path itself as the field name.
    pub strict_field_names: bool,
}

impl CompilerConfig {
    /// Build a compiler honoring this configuration.
    #[must_use]
    pub fn compiler(&self) -> PlanCompiler {
        PlanCompiler::new(self.unknown_operators)
    }

    /// Build the static field-name resolver described by this configuration.
    #[must_use]
    pub fn field_map(&self) -> FieldMap {
        let map: FieldMap = self
            .field_names
            .iter()
            .map(|(path, field)| (path.as_str(), field.as_str()))
            .collect();
        if self.strict_field_names {
            map.strict()
        } else {
            map
        }
    }
}
