//! PEP query plan compiler.
//!
//! Compiles PDP access plans into [`FilterTree`]s for the data store.
//!
//! ## Plan kinds (fail-closed)
//!
//! | kind           | filter  | Result |
//! |----------------|---------|--------|
//! | always denied  | *       | `Denied` |
//! | always allowed | *       | `FilterTree::Empty` (unrestricted) |
//! | conditional    | absent  | `MissingCondition` |
//! | conditional    | present | compile the access plan |
//!
//! ## Operator table
//!
//! | plan | filter |
//! |------|--------|
//! | `and` / `or` | `AND` / `OR` |
//! | `eq`  | `equals` |
//! | `ne`  | `not` |
//! | `lt` / `gt` / `lte` / `gte` | same name |
//! | `in`  | `in` (a scalar literal becomes a one-element array) |
//!
//! Nodes the compiler does not understand are governed by
//! [`UnknownOperatorPolicy`]: `Skip` contributes an empty filter (`{}`) at
//! that position, `Reject` fails the compile call.

use modkit_filter::{FieldCondition, FilterTree};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::UnknownOperatorPolicy;
use crate::models::{Expression, Operand, Operator, PlanKind, QueryPlanResponse};
use crate::resolver::{FieldNameResolver, ResolveError};

/// Error during access plan compilation.
#[derive(Debug, thiserror::Error)]
pub enum PlanCompileError {
    /// The PDP denies access to every resource of the kind.
    #[error("access denied by PDP")]
    Denied,

    /// A conditional plan arrived without an access plan.
    #[error("conditional query plan has no filter")]
    MissingCondition,

    /// The plan uses an operator with no filter equivalent (`Reject` only).
    #[error("unsupported operator `{operator}` in access plan")]
    UnsupportedOperator { operator: String },

    /// A node does not have a recognized shape (`Reject` only).
    #[error("malformed access plan node: {reason}")]
    MalformedNode { reason: String },

    /// The field-name resolver failed.
    #[error(transparent)]
    Resolver(#[from] ResolveError),
}

/// Compiles access plans into data-store filters.
///
/// Holds no state between calls. Each recursive step builds a fresh output
/// node, so sibling branches never share mutable state.
#[derive(Debug, Clone, Default)]
pub struct PlanCompiler {
    unknown_operators: UnknownOperatorPolicy,
}

impl PlanCompiler {
    #[must_use]
    pub fn new(unknown_operators: UnknownOperatorPolicy) -> Self {
        Self { unknown_operators }
    }

    /// Compiler that rejects unsupported operators and malformed nodes.
    #[must_use]
    pub fn fail_closed() -> Self {
        Self::new(UnknownOperatorPolicy::Reject)
    }

    #[must_use]
    pub fn unknown_operators(&self) -> UnknownOperatorPolicy {
        self.unknown_operators
    }

    /// Compile an access plan.
    ///
    /// The output mirrors the shape of the plan: conjunction children keep
    /// their order, and every comparison leaf is keyed by the field name
    /// `resolver` returns for its variable.
    ///
    /// # Errors
    ///
    /// - [`PlanCompileError::Resolver`] if the resolver fails
    /// - [`PlanCompileError::UnsupportedOperator`] / [`PlanCompileError::MalformedNode`]
    ///   under [`UnknownOperatorPolicy::Reject`]
    pub fn compile(
        &self,
        plan: &Operand,
        resolver: &dyn FieldNameResolver,
    ) -> Result<FilterTree, PlanCompileError> {
        match plan {
            Operand::Expression(expression) => self.compile_expression(expression, resolver),
            Operand::Variable(_) | Operand::Value(_) => {
                self.malformed("leaf operand in expression position")
            }
            Operand::Unrecognized(_) => self.malformed("unrecognized operand shape"),
        }
    }

    /// Compile a PDP response according to its plan kind.
    ///
    /// # Errors
    ///
    /// - [`PlanCompileError::Denied`] if the plan is always denied
    /// - [`PlanCompileError::MissingCondition`] if a conditional plan has no filter
    /// - any error of [`PlanCompiler::compile`]
    #[tracing::instrument(
        skip_all,
        fields(kind = ?response.kind, resource_kind = %response.resource_kind)
    )]
    pub fn compile_response(
        &self,
        response: &QueryPlanResponse,
        resolver: &dyn FieldNameResolver,
    ) -> Result<FilterTree, PlanCompileError> {
        match response.kind {
            PlanKind::AlwaysDenied => {
                debug!("query plan is always denied");
                Err(PlanCompileError::Denied)
            }
            PlanKind::AlwaysAllowed => {
                debug!("query plan is always allowed, no filter applied");
                Ok(FilterTree::Empty)
            }
            PlanKind::Conditional => {
                let Some(filter) = &response.filter else {
                    return Err(PlanCompileError::MissingCondition);
                };
                self.compile(filter, resolver)
            }
        }
    }

    fn compile_expression(
        &self,
        expression: &Expression,
        resolver: &dyn FieldNameResolver,
    ) -> Result<FilterTree, PlanCompileError> {
        let operands = &expression.operands;
        match &expression.operator {
            Operator::And => Ok(FilterTree::all_of(self.compile_all(operands, resolver)?)),
            Operator::Or => Ok(FilterTree::any_of(self.compile_all(operands, resolver)?)),
            Operator::Other(tag) => self.unsupported(tag),
            comparison => self.compile_comparison(comparison, operands, resolver),
        }
    }

    fn compile_all(
        &self,
        operands: &[Operand],
        resolver: &dyn FieldNameResolver,
    ) -> Result<Vec<FilterTree>, PlanCompileError> {
        operands
            .iter()
            .map(|operand| self.compile(operand, resolver))
            .collect()
    }

    fn compile_comparison(
        &self,
        operator: &Operator,
        operands: &[Operand],
        resolver: &dyn FieldNameResolver,
    ) -> Result<FilterTree, PlanCompileError> {
        let [Operand::Variable(path), Operand::Value(literal)] = operands else {
            return self.malformed("comparison operands must be a variable followed by a value");
        };
        let Some(condition) = field_condition(operator, literal) else {
            return self.unsupported(operator.as_str());
        };
        let field = resolver.resolve(path)?;
        Ok(FilterTree::field(field, condition))
    }

    fn unsupported(&self, operator: &str) -> Result<FilterTree, PlanCompileError> {
        match self.unknown_operators {
            UnknownOperatorPolicy::Skip => {
                warn!(
                    operator,
                    "unsupported access plan operator contributes no constraint"
                );
                Ok(FilterTree::Empty)
            }
            UnknownOperatorPolicy::Reject => Err(PlanCompileError::UnsupportedOperator {
                operator: operator.to_owned(),
            }),
        }
    }

    fn malformed(&self, reason: &str) -> Result<FilterTree, PlanCompileError> {
        match self.unknown_operators {
            UnknownOperatorPolicy::Skip => {
                debug!(reason, "skipping malformed access plan node");
                Ok(FilterTree::Empty)
            }
            UnknownOperatorPolicy::Reject => Err(PlanCompileError::MalformedNode {
                reason: reason.to_owned(),
            }),
        }
    }
}

/// Map a comparison operator and its literal to a field condition.
///
/// A scalar `in` literal becomes a one-element candidate set. Returns `None`
/// for conjunctions and unknown operators.
fn field_condition(operator: &Operator, literal: &Value) -> Option<FieldCondition> {
    let condition = match operator {
        Operator::Eq => FieldCondition::Equals(literal.clone()),
        Operator::Ne => FieldCondition::Not(literal.clone()),
        Operator::Lt => FieldCondition::Lt(literal.clone()),
        Operator::Gt => FieldCondition::Gt(literal.clone()),
        Operator::Lte => FieldCondition::Lte(literal.clone()),
        Operator::Gte => FieldCondition::Gte(literal.clone()),
        Operator::In => match literal {
            Value::Array(items) => FieldCondition::In(items.clone()),
            scalar => FieldCondition::In(vec![scalar.clone()]),
        },
        Operator::And | Operator::Or | Operator::Other(_) => return None,
    };
    Some(condition)
}

/// Compile an access plan with the default (permissive) compiler.
///
/// # Errors
///
/// Returns [`PlanCompileError::Resolver`] if `resolver` fails. Unsupported
/// operators and malformed nodes contribute an empty filter instead.
pub fn compile(
    plan: &Operand,
    resolver: &dyn FieldNameResolver,
) -> Result<FilterTree, PlanCompileError> {
    PlanCompiler::default().compile(plan, resolver)
}
