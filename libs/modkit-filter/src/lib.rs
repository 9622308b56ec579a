#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Store-side filter vocabulary.
//!
//! A [`FilterTree`] is the nested predicate structure handed to a data-store
//! client as the `where` argument of a find/query call:
//!
//! - `{"AND": [..]}` / `{"OR": [..]}` for conjunctions
//! - `{"<field>": {"<op>": value}}` for field conditions
//! - `{}` for "no constraint"

pub mod filter_tree;

pub use filter_tree::{FieldCondition, FilterTree, keys};
