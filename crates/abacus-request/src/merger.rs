//! Attribute merging.
//!
//! A category occurrence may declare the same attribute several times; how
//! repeated declarations combine is decided once, at construction time, by
//! a [`MergePolicy`]:
//!
//! | `allow_attribute_duplicates` | `strict_attribute_issuer_match` | Policy |
//! |---|---|---|
//! | `false` | `true` | [`MergePolicy::Strict`] |
//! | `true` | `true` | [`MergePolicy::LaxNoCopy`] |
//! | `true` | `false` | [`MergePolicy::LaxIssuerCopy`] |
//! | `false` | `false` | rejected |

use std::sync::Arc;

use abacus_types::{
    AttributeKey, AttributeSource, AttributeValue, Bag, GrowableBag, XPathContext, ids,
};
use tracing::warn;

use crate::attributes::AttributeMap;
use crate::category::RawAttribute;
use crate::error::{RequestError, Result};
use crate::value::ValueFactory;

// ============================================================================
// MergePolicy
// ============================================================================

/// How repeated declarations of one attribute are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergePolicy {
    /// Each attribute may be declared once per category; a repeat is an error.
    Strict,
    /// Repeats are concatenated. Issuer-less and issued attributes with the
    /// same id stay separate.
    LaxNoCopy,
    /// Repeats are concatenated, and every value of an issued attribute is
    /// also copied into its issuer-less counterpart, so issuer-less
    /// designators see it. Fully XACML-compliant, and the slowest mode.
    LaxIssuerCopy,
}

impl MergePolicy {
    /// Selects the policy from the two configuration flags.
    ///
    /// # Errors
    ///
    /// [`RequestError::InvalidConfiguration`] for
    /// `!allow_attribute_duplicates && !strict_attribute_issuer_match`:
    /// strict duplicate detection without strict issuer matching is not
    /// supported.
    pub fn from_flags(
        strict_attribute_issuer_match: bool,
        allow_attribute_duplicates: bool,
    ) -> Result<Self> {
        match (allow_attribute_duplicates, strict_attribute_issuer_match) {
            (false, true) => Ok(Self::Strict),
            (true, true) => Ok(Self::LaxNoCopy),
            (true, false) => Ok(Self::LaxIssuerCopy),
            (false, false) => Err(RequestError::InvalidConfiguration(
                "allow_attribute_duplicates = false requires strict_attribute_issuer_match = true"
                    .to_string(),
            )),
        }
    }
}

// ============================================================================
// AttributeAccumulator
// ============================================================================

/// Bags being built for one category, across all of its occurrences seen so
/// far.
#[derive(Debug, Clone, Default)]
pub struct AttributeAccumulator {
    bags: AttributeMap<GrowableBag>,
}

impl AttributeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }

    pub fn get(&self, key: &AttributeKey) -> Option<&GrowableBag> {
        self.bags.get(key)
    }

    /// Freezes every bag, keeping first-declaration order.
    pub fn freeze(self) -> AttributeMap<Bag> {
        self.bags.map_values(GrowableBag::freeze)
    }
}

// ============================================================================
// AttributeMerger
// ============================================================================

/// Merges raw attribute declarations into an [`AttributeAccumulator`].
#[derive(Clone)]
pub struct AttributeMerger {
    policy: MergePolicy,
    factory: Arc<dyn ValueFactory>,
}

impl std::fmt::Debug for AttributeMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeMerger")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AttributeMerger {
    pub fn new(policy: MergePolicy, factory: Arc<dyn ValueFactory>) -> Self {
        Self { policy, factory }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Parses the values of one raw attribute and merges them into
    /// `accumulator`.
    ///
    /// Returns the values of this occurrence alone, as a frozen bag (used
    /// for `IncludeInResult` echoing).
    ///
    /// Whenever the resource scope attribute is written, its bag must hold
    /// exactly one value, `Immediate`.
    ///
    /// # Errors
    ///
    /// - [`RequestError::DuplicateAttribute`] in strict mode on a repeat
    /// - [`RequestError::DatatypeMismatch`] if a repeat changes datatype
    /// - [`RequestError::UnsupportedScope`] on any other resource scope
    /// - any value-factory error for the raw values
    pub fn merge_occurrence(
        &self,
        category_id: &str,
        raw: &RawAttribute,
        xpath_context: Option<&XPathContext>,
        accumulator: &mut AttributeAccumulator,
    ) -> Result<Bag> {
        let key = AttributeKey::new(category_id, raw.issuer.as_deref(), raw.attribute_id.as_str());
        let values = raw
            .values
            .iter()
            .map(|v| self.factory.create(&raw.datatype, v, xpath_context))
            .collect::<Result<Vec<_>>>()?;

        match self.policy {
            MergePolicy::Strict => {
                let bag = bag_of(&key, raw, &values)?;
                if !accumulator.bags.insert_new(key.clone(), bag) {
                    warn!(attribute = %key, "Duplicate attribute rejected in strict mode");
                    return Err(RequestError::DuplicateAttribute { key });
                }
                check_scope(&key, accumulator)?;
            }
            MergePolicy::LaxNoCopy => {
                append(&key, raw, &values, accumulator)?;
            }
            MergePolicy::LaxIssuerCopy => {
                append(&key, raw, &values, accumulator)?;
                if key.issuer().is_some() {
                    append(&key.without_issuer(), raw, &values, accumulator)?;
                }
            }
        }

        let mut occurrence = GrowableBag::new(raw.datatype.clone(), AttributeSource::Request);
        for value in values {
            occurrence
                .push(value)
                .map_err(|source| RequestError::DatatypeMismatch {
                    key: key.clone(),
                    source,
                })?;
        }
        Ok(occurrence.freeze())
    }
}

/// Builds the growable bag for a single occurrence.
fn bag_of(
    key: &AttributeKey,
    raw: &RawAttribute,
    values: &[AttributeValue],
) -> Result<GrowableBag> {
    let mut bag = GrowableBag::new(raw.datatype.clone(), AttributeSource::Request);
    push_all(key, &mut bag, values)?;
    Ok(bag)
}

/// Appends `values` to the bag for `key`, creating it if needed.
fn append(
    key: &AttributeKey,
    raw: &RawAttribute,
    values: &[AttributeValue],
    accumulator: &mut AttributeAccumulator,
) -> Result<()> {
    let bag = accumulator.bags.get_or_insert_with(key, || {
        GrowableBag::new(raw.datatype.clone(), AttributeSource::Request)
    });
    if bag.datatype() != &raw.datatype {
        warn!(
            attribute = %key,
            expected = %bag.datatype(),
            actual = %raw.datatype,
            "Attribute datatype mismatch"
        );
        return Err(RequestError::DatatypeMismatch {
            key: key.clone(),
            source: abacus_types::BagError::DatatypeMismatch {
                expected: bag.datatype().clone(),
                actual: raw.datatype.clone(),
            },
        });
    }
    push_all(key, bag, values)?;
    check_scope(key, accumulator)
}

fn push_all(key: &AttributeKey, bag: &mut GrowableBag, values: &[AttributeValue]) -> Result<()> {
    for value in values {
        bag.push(value.clone())
            .map_err(|source| RequestError::DatatypeMismatch {
                key: key.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Hierarchical resource scopes (`Children`, `Descendants`) are not
/// supported: a written resource scope must be exactly `Immediate`.
fn check_scope(key: &AttributeKey, accumulator: &AttributeAccumulator) -> Result<()> {
    if key.category() != ids::CATEGORY_RESOURCE || key.attribute_id() != ids::RESOURCE_SCOPE {
        return Ok(());
    }
    let Some(bag) = accumulator.get(key) else {
        return Ok(());
    };

    let reason = match bag.values() {
        [value] if value.lexical() == ids::RESOURCE_SCOPE_IMMEDIATE => return Ok(()),
        [] => "no value".to_string(),
        [value] => format!(
            "'{}' (only '{}' is supported)",
            value.lexical(),
            ids::RESOURCE_SCOPE_IMMEDIATE
        ),
        values => format!("{} values, expected exactly one", values.len()),
    };
    warn!(attribute = %key, %reason, "Invalid resource scope");
    Err(RequestError::UnsupportedScope { reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StandardValueFactory;
    use abacus_types::Datatype;
    use test_case::test_case;

    const CAT: &str = ids::CATEGORY_ACCESS_SUBJECT;

    fn merger(policy: MergePolicy) -> AttributeMerger {
        AttributeMerger::new(policy, Arc::new(StandardValueFactory))
    }

    fn lexicals(bag: &GrowableBag) -> Vec<&str> {
        bag.values().iter().map(AttributeValue::lexical).collect()
    }

    #[test_case(false, true => Some(MergePolicy::Strict); "strict")]
    #[test_case(true, true => Some(MergePolicy::LaxNoCopy); "lax without copy")]
    #[test_case(true, false => Some(MergePolicy::LaxIssuerCopy); "lax with issuer copy")]
    #[test_case(false, false => None; "unsupported combination")]
    fn policy_from_flags(allow_duplicates: bool, strict_issuer: bool) -> Option<MergePolicy> {
        MergePolicy::from_flags(strict_issuer, allow_duplicates).ok()
    }

    #[test]
    fn rejected_combination_is_a_configuration_error() {
        let err = MergePolicy::from_flags(false, false).unwrap_err();
        assert_eq!(err.kind(), abacus_types::ErrorKind::Configuration);
    }

    #[test]
    fn strict_rejects_repeated_attribute() {
        let merger = merger(MergePolicy::Strict);
        let mut acc = AttributeAccumulator::new();
        let raw = RawAttribute::string("role", ["doctor"]).with_issuer("idp");

        merger.merge_occurrence(CAT, &raw, None, &mut acc).unwrap();
        let err = merger.merge_occurrence(CAT, &raw, None, &mut acc).unwrap_err();

        assert!(matches!(err, RequestError::DuplicateAttribute { .. }));
    }

    #[test]
    fn strict_allows_same_id_with_other_issuer() {
        let merger = merger(MergePolicy::Strict);
        let mut acc = AttributeAccumulator::new();

        merger
            .merge_occurrence(CAT, &RawAttribute::string("role", ["a"]), None, &mut acc)
            .unwrap();
        merger
            .merge_occurrence(
                CAT,
                &RawAttribute::string("role", ["b"]).with_issuer("idp"),
                None,
                &mut acc,
            )
            .unwrap();

        assert_eq!(acc.len(), 2);
    }

    #[test_case(MergePolicy::LaxNoCopy; "no copy")]
    #[test_case(MergePolicy::LaxIssuerCopy; "issuer copy")]
    fn lax_concatenates_in_order(policy: MergePolicy) {
        let merger = merger(policy);
        let mut acc = AttributeAccumulator::new();

        merger
            .merge_occurrence(CAT, &RawAttribute::string("role", ["a", "b"]), None, &mut acc)
            .unwrap();
        let second = merger
            .merge_occurrence(CAT, &RawAttribute::string("role", ["c"]), None, &mut acc)
            .unwrap();

        let bag = acc.get(&AttributeKey::unissued(CAT, "role")).unwrap();
        assert_eq!(lexicals(bag), ["a", "b", "c"]);
        assert_eq!(second.len(), 1, "returned bag holds this occurrence only");
    }

    #[test]
    fn issuer_copy_feeds_issuerless_bag() {
        let merger = merger(MergePolicy::LaxIssuerCopy);
        let mut acc = AttributeAccumulator::new();

        merger
            .merge_occurrence(
                CAT,
                &RawAttribute::string("role", ["v"]).with_issuer("X"),
                None,
                &mut acc,
            )
            .unwrap();

        let issued = acc.get(&AttributeKey::new(CAT, Some("X"), "role")).unwrap();
        let unissued = acc.get(&AttributeKey::unissued(CAT, "role")).unwrap();
        assert_eq!(lexicals(issued), ["v"]);
        assert_eq!(lexicals(unissued), ["v"]);
    }

    #[test]
    fn no_copy_keeps_issuerless_bag_absent() {
        let merger = merger(MergePolicy::LaxNoCopy);
        let mut acc = AttributeAccumulator::new();

        merger
            .merge_occurrence(
                CAT,
                &RawAttribute::string("role", ["v"]).with_issuer("X"),
                None,
                &mut acc,
            )
            .unwrap();

        assert!(acc.get(&AttributeKey::unissued(CAT, "role")).is_none());
        assert_eq!(acc.len(), 1);
    }

    #[test_case(MergePolicy::Strict; "strict")]
    #[test_case(MergePolicy::LaxNoCopy; "no copy")]
    #[test_case(MergePolicy::LaxIssuerCopy; "issuer copy")]
    fn datatype_mismatch_is_fatal(policy: MergePolicy) {
        let merger = merger(policy);
        let mut acc = AttributeAccumulator::new();

        merger
            .merge_occurrence(CAT, &RawAttribute::string("age", ["a"]), None, &mut acc)
            .unwrap();
        let err = merger
            .merge_occurrence(
                CAT,
                &RawAttribute::new("age", Datatype::integer(), ["42"]),
                None,
                &mut acc,
            )
            .unwrap_err();

        // Strict reports the repeat before looking at datatypes.
        assert!(matches!(
            err,
            RequestError::DatatypeMismatch { .. } | RequestError::DuplicateAttribute { .. }
        ));
        if policy != MergePolicy::Strict {
            assert!(matches!(err, RequestError::DatatypeMismatch { .. }));
        }
    }

    #[test]
    fn issuer_copy_mismatch_on_issuerless_counterpart() {
        let merger = merger(MergePolicy::LaxIssuerCopy);
        let mut acc = AttributeAccumulator::new();

        merger
            .merge_occurrence(CAT, &RawAttribute::string("age", ["a"]), None, &mut acc)
            .unwrap();
        let err = merger
            .merge_occurrence(
                CAT,
                &RawAttribute::new("age", Datatype::integer(), ["42"]).with_issuer("X"),
                None,
                &mut acc,
            )
            .unwrap_err();

        assert!(matches!(err, RequestError::DatatypeMismatch { .. }));
    }

    fn scope(values: &[&str]) -> RawAttribute {
        RawAttribute::string(ids::RESOURCE_SCOPE, values.iter().copied())
    }

    #[test_case(&["Immediate"] => true; "immediate")]
    #[test_case(&["Descendants"] => false; "descendants")]
    #[test_case(&["Children"] => false; "children")]
    #[test_case(&[] => false; "no value")]
    #[test_case(&["Immediate", "Immediate"] => false; "two values")]
    fn resource_scope(values: &[&str]) -> bool {
        let merger = merger(MergePolicy::LaxIssuerCopy);
        let mut acc = AttributeAccumulator::new();
        match merger.merge_occurrence(ids::CATEGORY_RESOURCE, &scope(values), None, &mut acc) {
            Ok(_) => true,
            Err(RequestError::UnsupportedScope { .. }) => false,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repeated_immediate_scope_is_rejected_in_lax_mode() {
        let merger = merger(MergePolicy::LaxNoCopy);
        let mut acc = AttributeAccumulator::new();

        merger
            .merge_occurrence(ids::CATEGORY_RESOURCE, &scope(&["Immediate"]), None, &mut acc)
            .unwrap();
        let err = merger
            .merge_occurrence(ids::CATEGORY_RESOURCE, &scope(&["Immediate"]), None, &mut acc)
            .unwrap_err();

        assert!(matches!(err, RequestError::UnsupportedScope { .. }));
    }

    #[test]
    fn scope_outside_resource_category_is_ignored() {
        let merger = merger(MergePolicy::Strict);
        let mut acc = AttributeAccumulator::new();
        merger
            .merge_occurrence(CAT, &scope(&["Descendants"]), None, &mut acc)
            .unwrap();
    }

    #[test]
    fn invalid_value_aborts_before_merge() {
        let merger = merger(MergePolicy::LaxNoCopy);
        let mut acc = AttributeAccumulator::new();
        let err = merger
            .merge_occurrence(
                CAT,
                &RawAttribute::new("flag", Datatype::boolean(), ["maybe"]),
                None,
                &mut acc,
            )
            .unwrap_err();

        assert!(matches!(err, RequestError::InvalidValue { .. }));
        assert!(acc.is_empty());
    }
}
