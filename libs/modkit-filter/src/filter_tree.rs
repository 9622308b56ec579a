use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Key names of the rendered filter objects.
pub mod keys {
    pub const AND: &str = "AND";
    pub const OR: &str = "OR";

    pub const EQUALS: &str = "equals";
    pub const NOT: &str = "not";
    pub const LT: &str = "lt";
    pub const GT: &str = "gt";
    pub const LTE: &str = "lte";
    pub const GTE: &str = "gte";
    pub const IN: &str = "in";
}

/// Operator object attached to a single field, e.g. `{"equals": "Sales"}`.
///
/// All variants carry a scalar literal except [`FieldCondition::In`], which
/// carries the candidate set.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldCondition {
    Equals(Value),
    Not(Value),
    Lt(Value),
    Gt(Value),
    Lte(Value),
    Gte(Value),
    In(Vec<Value>),
}

impl FieldCondition {
    /// The operator key used when rendering this condition.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Equals(_) => keys::EQUALS,
            Self::Not(_) => keys::NOT,
            Self::Lt(_) => keys::LT,
            Self::Gt(_) => keys::GT,
            Self::Lte(_) => keys::LTE,
            Self::Gte(_) => keys::GTE,
            Self::In(_) => keys::IN,
        }
    }

    /// Render as a single-key JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let literal = match self {
            Self::Equals(v)
            | Self::Not(v)
            | Self::Lt(v)
            | Self::Gt(v)
            | Self::Lte(v)
            | Self::Gte(v) => v.clone(),
            Self::In(values) => Value::Array(values.clone()),
        };
        let mut object = Map::new();
        object.insert(self.key().to_owned(), literal);
        Value::Object(object)
    }
}

impl Serialize for FieldCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Equals(v)
            | Self::Not(v)
            | Self::Lt(v)
            | Self::Gt(v)
            | Self::Lte(v)
            | Self::Gte(v) => map.serialize_entry(self.key(), v)?,
            Self::In(values) => map.serialize_entry(self.key(), values)?,
        }
        map.end()
    }
}

/// A filter in the data store's vocabulary.
///
/// The tree has no identity beyond its shape. [`FilterTree::Empty`] renders
/// as `{}` and places no constraint on the rows it is applied to.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FilterTree {
    /// All children must match (`{"AND": [..]}`).
    And(Vec<FilterTree>),
    /// Any child may match (`{"OR": [..]}`).
    Or(Vec<FilterTree>),
    /// A condition on one store field (`{"<name>": {"<op>": v}}`).
    Field {
        name: String,
        condition: FieldCondition,
    },
    /// No constraint (`{}`).
    #[default]
    Empty,
}

impl FilterTree {
    // ── Constructors ────────────────────────────────────────────────

    /// A condition on a single store field.
    #[must_use]
    pub fn field(name: impl Into<String>, condition: FieldCondition) -> Self {
        Self::Field {
            name: name.into(),
            condition,
        }
    }

    /// Conjunction of the given filters, order preserved.
    #[must_use]
    pub fn all_of(children: Vec<FilterTree>) -> Self {
        Self::And(children)
    }

    /// Disjunction of the given filters, order preserved.
    #[must_use]
    pub fn any_of(children: Vec<FilterTree>) -> Self {
        Self::Or(children)
    }

    /// Combine this filter with another one under an outer `AND`.
    ///
    /// This is how an access filter is merged with a pre-existing `where`
    /// constraint. [`FilterTree::Empty`] on either side is absorbed, so
    /// `Empty.and(x) == x`.
    #[must_use]
    pub fn and(self, other: FilterTree) -> Self {
        match (self, other) {
            (Self::Empty, other) => other,
            (this, Self::Empty) => this,
            (this, other) => Self::And(vec![this, other]),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Returns `true` if this filter places no constraint.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Store field names referenced by this tree, in depth-first order.
    ///
    /// A field that appears in several leaves is listed once per leaf.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_field_names(&mut names);
        names
    }

    fn collect_field_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_field_names(names);
                }
            }
            Self::Field { name, .. } => names.push(name),
            Self::Empty => {}
        }
    }

    /// Render as the JSON object the data-store client expects.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        match self {
            Self::And(children) => {
                object.insert(keys::AND.to_owned(), render_all(children));
            }
            Self::Or(children) => {
                object.insert(keys::OR.to_owned(), render_all(children));
            }
            Self::Field { name, condition } => {
                object.insert(name.clone(), condition.to_json());
            }
            Self::Empty => {}
        }
        Value::Object(object)
    }
}

fn render_all(children: &[FilterTree]) -> Value {
    Value::Array(children.iter().map(FilterTree::to_json).collect())
}

impl Serialize for FilterTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::And(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(keys::AND, children)?;
                map.end()
            }
            Self::Or(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(keys::OR, children)?;
                map.end()
            }
            Self::Field { name, condition } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, condition)?;
                map.end()
            }
            Self::Empty => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

impl From<FilterTree> for Value {
    fn from(tree: FilterTree) -> Self {
        tree.to_json()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn department_is_sales() -> FilterTree {
        FilterTree::field("department", FieldCondition::Equals(json!("Sales")))
    }

    #[test]
    fn empty_renders_as_empty_object() {
        assert_eq!(FilterTree::Empty.to_json(), json!({}));
        assert!(FilterTree::default().is_empty());
    }

    #[test]
    fn field_conditions_render_single_key_objects() {
        let cases = [
            (FieldCondition::Equals(json!("a")), json!({"equals": "a"})),
            (FieldCondition::Not(json!("a")), json!({"not": "a"})),
            (FieldCondition::Lt(json!(1)), json!({"lt": 1})),
            (FieldCondition::Gt(json!(1)), json!({"gt": 1})),
            (FieldCondition::Lte(json!(1.5)), json!({"lte": 1.5})),
            (FieldCondition::Gte(json!(1)), json!({"gte": 1})),
            (
                FieldCondition::In(vec![json!("x"), json!("y")]),
                json!({"in": ["x", "y"]}),
            ),
        ];

        for (condition, expected) in cases {
            assert_eq!(condition.to_json(), expected);
        }
    }

    #[test]
    fn nested_tree_renders_prisma_shape() {
        let tree = FilterTree::all_of(vec![
            department_is_sales(),
            FilterTree::any_of(vec![
                FilterTree::field("active", FieldCondition::Equals(json!(true))),
                FilterTree::field("score", FieldCondition::Gte(json!(50))),
            ]),
        ]);

        assert_eq!(
            tree.to_json(),
            json!({
                "AND": [
                    {"department": {"equals": "Sales"}},
                    {"OR": [
                        {"active": {"equals": true}},
                        {"score": {"gte": 50}}
                    ]}
                ]
            })
        );
    }

    #[test]
    fn serialize_matches_to_json() {
        let tree = FilterTree::any_of(vec![
            department_is_sales(),
            FilterTree::Empty,
            FilterTree::field("id", FieldCondition::In(vec![json!(1), json!(2)])),
        ]);

        let serialized = serde_json::to_value(&tree).expect("filter tree serializes");
        assert_eq!(serialized, tree.to_json());
    }

    #[test]
    fn and_absorbs_empty_operands() {
        assert_eq!(
            FilterTree::Empty.and(department_is_sales()),
            department_is_sales()
        );
        assert_eq!(
            department_is_sales().and(FilterTree::Empty),
            department_is_sales()
        );
        assert!(FilterTree::Empty.and(FilterTree::Empty).is_empty());
    }

    #[test]
    fn and_wraps_existing_constraint() {
        let existing = FilterTree::field("archived", FieldCondition::Equals(json!(false)));
        let combined = department_is_sales().and(existing);

        assert_eq!(
            combined.to_json(),
            json!({
                "AND": [
                    {"department": {"equals": "Sales"}},
                    {"archived": {"equals": false}}
                ]
            })
        );
    }

    #[test]
    fn field_names_are_collected_depth_first() {
        let tree = FilterTree::all_of(vec![
            department_is_sales(),
            FilterTree::any_of(vec![
                FilterTree::field("active", FieldCondition::Equals(json!(true))),
                FilterTree::Empty,
                FilterTree::field("department", FieldCondition::Not(json!("IT"))),
            ]),
        ]);

        assert_eq!(tree.field_names(), vec!["department", "active", "department"]);
    }
}
