//! Field-name resolution.
//!
//! Access plans reference policy-side attribute paths
//! (`request.resource.attr.department`), while the data store knows its own
//! field names (`department`). A [`FieldNameResolver`] bridges the two
//! naming schemes at every leaf the compiler emits.
//!
//! Available resolvers:
//! - [`FieldMap`] - read-only static mapping, identity for unseen paths
//!   (or an error in strict mode)
//! - [`Identity`] - every path is its own field name
//! - any `Fn(&str) -> Result<String, ResolveError>`
//! - [`RecordingResolver`] - wraps another resolver and records which paths
//!   were referenced

use std::collections::BTreeMap;

use parking_lot::Mutex;

/// Error raised by a field-name resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A strict mapping has no entry for the path.
    #[error("no field mapping for variable `{path}`")]
    Unmapped { path: String },

    /// A custom resolver rejected the path.
    #[error("cannot resolve field name for variable `{path}`: {reason}")]
    Failed { path: String, reason: String },
}

impl ResolveError {
    #[must_use]
    pub fn failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The variable path that could not be resolved.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Unmapped { path } | Self::Failed { path, .. } => path,
        }
    }
}

/// Maps an access plan variable path to a data-store field name.
///
/// Implementations must be referentially stable for the duration of a
/// compile call: the same path resolves to the same field name.
pub trait FieldNameResolver {
    /// Resolve `path` to a store field name.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the path cannot be mapped. The compiler
    /// propagates it unchanged and aborts the compile call.
    fn resolve(&self, path: &str) -> Result<String, ResolveError>;
}

impl<F> FieldNameResolver for F
where
    F: Fn(&str) -> Result<String, ResolveError>,
{
    fn resolve(&self, path: &str) -> Result<String, ResolveError> {
        self(path)
    }
}

/// Resolves every path to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl FieldNameResolver for Identity {
    fn resolve(&self, path: &str) -> Result<String, ResolveError> {
        Ok(path.to_owned())
    }
}

/// Read-only static mapping from variable path to field name.
///
/// Unseen paths resolve to themselves unless the map is strict, in which
/// case they fail with [`ResolveError::Unmapped`]. The map is never
/// modified by resolution; see [`RecordingResolver`] for tracking which
/// paths a plan referenced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: BTreeMap<String, String>,
    strict: bool,
}

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping (builder style).
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, field: impl Into<String>) -> Self {
        self.fields.insert(path.into(), field.into());
        self
    }

    /// Reject unseen paths instead of resolving them to themselves.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Add a mapping, returning the previous field name for `path`.
    pub fn insert(&mut self, path: impl Into<String>, field: impl Into<String>) -> Option<String> {
        self.fields.insert(path.into(), field.into())
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.fields.get(path).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(path, field)| (path.into(), field.into()))
                .collect(),
            strict: false,
        }
    }
}

impl FieldNameResolver for FieldMap {
    fn resolve(&self, path: &str) -> Result<String, ResolveError> {
        match self.fields.get(path) {
            Some(field) => Ok(field.clone()),
            None if self.strict => Err(ResolveError::Unmapped {
                path: path.to_owned(),
            }),
            None => Ok(path.to_owned()),
        }
    }
}

/// Records every path resolved through the wrapped resolver.
///
/// The first successful resolution of a path is remembered and returned for
/// later lookups of the same path, so resolution is idempotent and the
/// record grows by at most one entry per distinct path. Failed resolutions
/// are not recorded.
///
/// The record is behind a mutex; one instance may be shared by concurrent
/// compile calls.
#[derive(Debug, Default)]
pub struct RecordingResolver<R> {
    inner: R,
    seen: Mutex<BTreeMap<String, String>>,
}

impl<R: FieldNameResolver> RecordingResolver<R> {
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            seen: Mutex::new(BTreeMap::new()),
        }
    }

    /// Snapshot of referenced paths and the field names they resolved to.
    #[must_use]
    pub fn referenced(&self) -> BTreeMap<String, String> {
        self.seen.lock().clone()
    }

    /// Whether `path` has been resolved through this wrapper.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.seen.lock().contains_key(path)
    }

    /// Number of distinct paths resolved so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    /// Consume the wrapper, returning the inner resolver and the record.
    #[must_use]
    pub fn into_parts(self) -> (R, BTreeMap<String, String>) {
        (self.inner, self.seen.into_inner())
    }
}

impl<R: FieldNameResolver> FieldNameResolver for RecordingResolver<R> {
    fn resolve(&self, path: &str) -> Result<String, ResolveError> {
        if let Some(field) = self.seen.lock().get(path).cloned() {
            return Ok(field);
        }
        let field = self.inner.resolve(path)?;
        Ok(self
            .seen
            .lock()
            .entry(path.to_owned())
            .or_insert(field)
            .clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;

    use super::*;

    const DEPARTMENT: &str = "request.resource.attr.department";
    const OWNER: &str = "request.resource.attr.ownerId";

    #[test]
    fn identity_returns_path() {
        assert_eq!(Identity.resolve(DEPARTMENT).unwrap(), DEPARTMENT);
    }

    #[test]
    fn field_map_resolves_known_and_defaults_unknown() {
        let map = FieldMap::new().with(DEPARTMENT, "department");

        assert_eq!(map.resolve(DEPARTMENT).unwrap(), "department");
        assert_eq!(map.resolve(OWNER).unwrap(), OWNER);
        // resolution never mutates the map
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(OWNER), None);
    }

    #[test]
    fn strict_field_map_rejects_unknown() {
        let map = FieldMap::new().with(DEPARTMENT, "department").strict();

        assert!(map.is_strict());
        assert_eq!(
            map.resolve(OWNER),
            Err(ResolveError::Unmapped {
                path: OWNER.to_owned()
            })
        );
    }

    #[test]
    fn field_map_from_iterator() {
        let map: FieldMap = [(DEPARTMENT, "department"), (OWNER, "ownerId")]
            .into_iter()
            .collect();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(OWNER), Some("ownerId"));
        assert!(!map.is_strict());
    }

    #[test]
    fn closures_are_resolvers() {
        let strip = |path: &str| -> Result<String, ResolveError> {
            path.strip_prefix("request.resource.attr.")
                .map(ToOwned::to_owned)
                .ok_or_else(|| ResolveError::failed(path, "not a resource attribute"))
        };

        assert_eq!(strip.resolve(DEPARTMENT).unwrap(), "department");

        let err = strip.resolve("request.principal.id").unwrap_err();
        assert_eq!(err.path(), "request.principal.id");
        assert_eq!(
            err.to_string(),
            "cannot resolve field name for variable `request.principal.id`: not a resource attribute"
        );
    }

    #[test]
    fn recording_resolver_is_idempotent() {
        let recorder = RecordingResolver::new(FieldMap::new().with(DEPARTMENT, "department"));

        assert_eq!(recorder.resolve(DEPARTMENT).unwrap(), "department");
        assert_eq!(recorder.len(), 1);

        assert_eq!(recorder.resolve(DEPARTMENT).unwrap(), "department");
        assert_eq!(recorder.len(), 1);

        assert_eq!(recorder.resolve(OWNER).unwrap(), OWNER);
        assert_eq!(recorder.len(), 2);
        assert!(recorder.contains(OWNER));

        let referenced = recorder.referenced();
        assert_eq!(referenced.get(DEPARTMENT).map(String::as_str), Some("department"));
        assert_eq!(referenced.get(OWNER).map(String::as_str), Some(OWNER));
    }

    #[test]
    fn recording_resolver_caches_first_resolution() {
        let calls = Cell::new(0_u32);
        let counting = |path: &str| -> Result<String, ResolveError> {
            calls.set(calls.get() + 1);
            Ok(path.to_uppercase())
        };
        let recorder = RecordingResolver::new(counting);

        recorder.resolve(DEPARTMENT).unwrap();
        recorder.resolve(DEPARTMENT).unwrap();

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn recording_resolver_skips_failures() {
        let recorder = RecordingResolver::new(FieldMap::new().strict());

        assert!(recorder.resolve(OWNER).is_err());
        assert!(recorder.is_empty());

        let (inner, record) = recorder.into_parts();
        assert!(inner.is_strict());
        assert!(record.is_empty());
    }
}
