//! End-to-end tests for request expansion.

use std::sync::Arc;

use abacus_types::{AttributeKey, ContentHandle, ids};
use proptest::prelude::*;
use test_case::test_case;

use crate::{
    AttributeMerger, IndividualDecisionRequest, MergePolicy, MultipleDecisionExpander,
    RawAttribute, RawCategory, RequestError, RequestExpander, SingleDecisionExpander,
    StandardCategoryParser, StandardValueFactory,
};

fn parser(policy: MergePolicy) -> StandardCategoryParser {
    StandardCategoryParser::new(AttributeMerger::new(policy, Arc::new(StandardValueFactory)))
}

fn mdp() -> MultipleDecisionExpander {
    MultipleDecisionExpander::new(parser(MergePolicy::LaxIssuerCopy))
}

fn single() -> SingleDecisionExpander {
    SingleDecisionExpander::new(parser(MergePolicy::LaxIssuerCopy))
}

fn subject(id: &str) -> RawCategory {
    RawCategory::new(ids::CATEGORY_ACCESS_SUBJECT)
        .with_attribute(RawAttribute::string(ids::SUBJECT_ID, [id]))
}

fn resource(id: &str) -> RawCategory {
    RawCategory::new(ids::CATEGORY_RESOURCE)
        .with_attribute(RawAttribute::string(ids::RESOURCE_ID, [id]))
}

fn action(id: &str) -> RawCategory {
    RawCategory::new(ids::CATEGORY_ACTION)
        .with_attribute(RawAttribute::string(ids::ACTION_ID, [id]))
}

fn single_value<'a>(request: &'a IndividualDecisionRequest, category: &str, id: &str) -> &'a str {
    request
        .attribute(&AttributeKey::unissued(category, id))
        .and_then(|bag| bag.single_value())
        .map(|value| value.lexical())
        .unwrap()
}

// ============================================================================
// Multiple Decision Profile
// ============================================================================

#[test]
fn repeated_resource_yields_one_request_per_alternative() {
    let request = [subject("alice"), resource("doc1"), resource("doc2")];

    let individual = mdp().expand(&request, true).unwrap();

    assert_eq!(individual.len(), 2);
    let resources: Vec<&str> = individual
        .iter()
        .map(|r| single_value(r, ids::CATEGORY_RESOURCE, ids::RESOURCE_ID))
        .collect();
    assert_eq!(resources, ["doc1", "doc2"]);
    for r in &individual {
        assert_eq!(single_value(r, ids::CATEGORY_ACCESS_SUBJECT, ids::SUBJECT_ID), "alice");
        assert!(r.returns_policy_id_list());
    }
}

#[test]
fn cross_product_of_two_repeated_categories() {
    let request = [
        subject("alice"),
        resource("r1"),
        resource("r2"),
        action("a1"),
        action("a2"),
        action("a3"),
    ];

    let individual = mdp().expand(&request, false).unwrap();

    let pairs: Vec<(&str, &str)> = individual
        .iter()
        .map(|r| {
            (
                single_value(r, ids::CATEGORY_RESOURCE, ids::RESOURCE_ID),
                single_value(r, ids::CATEGORY_ACTION, ids::ACTION_ID),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        [
            ("r1", "a1"),
            ("r2", "a1"),
            ("r1", "a2"),
            ("r2", "a2"),
            ("r1", "a3"),
            ("r2", "a3"),
        ]
    );
    assert!(individual.iter().all(|r| r.attribute_count() == 3));
}

#[test]
fn no_repeated_category_matches_single_expansion() {
    let request = [subject("alice"), resource("doc1"), action("read")];

    let multiple = mdp().expand(&request, false).unwrap();
    let merged = single().expand(&request, false).unwrap();

    assert_eq!(multiple.len(), 1);
    assert_eq!(multiple, merged);
}

#[test]
fn empty_occurrence_is_not_an_alternative() {
    let request = [
        subject("alice"),
        RawCategory::new(ids::CATEGORY_RESOURCE),
        resource("doc1"),
    ];

    let individual = mdp().expand(&request, false).unwrap();

    assert_eq!(individual.len(), 1);
    assert_eq!(
        single_value(&individual[0], ids::CATEGORY_RESOURCE, ids::RESOURCE_ID),
        "doc1"
    );
}

#[test]
fn no_categories_yield_one_empty_request() {
    let individual = mdp().expand(&[], true).unwrap();

    assert_eq!(individual.len(), 1);
    assert_eq!(individual[0].attribute_count(), 0);
    assert!(individual[0].categories().is_empty());
}

#[test]
fn content_on_a_single_alternative_is_kept() {
    let request = [
        resource("doc1").with_content(ContentHandle::new(&b"<doc/>"[..])),
        resource("doc2"),
    ];

    let individual = mdp().expand(&request, false).unwrap();

    assert_eq!(individual.len(), 2);
    assert!(individual[0].content(ids::CATEGORY_RESOURCE).is_some());
    assert!(individual[1].content(ids::CATEGORY_RESOURCE).is_none());
}

#[test]
fn content_on_two_alternatives_is_rejected() {
    let request = [
        resource("doc1").with_content(ContentHandle::new(&b"<a/>"[..])),
        resource("doc2").with_content(ContentHandle::new(&b"<b/>"[..])),
    ];

    let err = mdp().expand(&request, false).unwrap_err();

    assert_eq!(
        err,
        RequestError::DuplicateContent {
            category: ids::CATEGORY_RESOURCE.to_string()
        }
    );
}

#[test_case(
    RawCategory::new(ids::CATEGORY_RESOURCE)
        .with_attribute(RawAttribute::string(ids::RESOURCE_SCOPE, ["Descendants"]))
    ; "unsupported scope"
)]
#[test_case(
    RawCategory::new(ids::CATEGORY_RESOURCE)
        .with_attribute(RawAttribute::new("size", abacus_types::Datatype::integer(), ["ten"]))
    ; "invalid value"
)]
#[test_case(
    RawCategory::new(ids::CATEGORY_RESOURCE)
        .with_attribute(RawAttribute::string(ids::MULTIPLE_CONTENT_SELECTOR, ["//doc"]))
    ; "content selector"
)]
fn failing_occurrence_aborts_expansion(bad: RawCategory) {
    let request = [subject("alice"), resource("doc1"), bad, action("read")];

    assert!(mdp().expand(&request, false).is_err());
    assert!(single().expand(&request, false).is_err());
}

#[test]
fn strict_merge_rejects_repeat_within_one_occurrence() {
    let expander = MultipleDecisionExpander::new(parser(MergePolicy::Strict));
    let request = [RawCategory::new(ids::CATEGORY_RESOURCE)
        .with_attribute(RawAttribute::string(ids::RESOURCE_ID, ["a"]))
        .with_attribute(RawAttribute::string(ids::RESOURCE_ID, ["b"]))];

    let err = expander.expand(&request, false).unwrap_err();

    assert!(matches!(err, RequestError::DuplicateAttribute { .. }));
}

#[test]
fn strict_merge_allows_repeat_across_alternatives() {
    let expander = MultipleDecisionExpander::new(parser(MergePolicy::Strict));
    let request = [resource("a"), resource("b")];

    assert_eq!(expander.expand(&request, false).unwrap().len(), 2);
}

#[test]
fn echoed_attributes_follow_their_alternative() {
    let request = [
        RawCategory::new(ids::CATEGORY_RESOURCE)
            .with_attribute(RawAttribute::string(ids::RESOURCE_ID, ["doc1"]).included_in_result()),
        RawCategory::new(ids::CATEGORY_RESOURCE)
            .with_attribute(RawAttribute::string(ids::RESOURCE_ID, ["doc2"]).included_in_result()),
    ];

    let individual = mdp().expand(&request, false).unwrap();

    let echoed: Vec<&str> = individual
        .iter()
        .map(|r| {
            let echo = &r.attributes_to_echo()[0];
            echo.attributes[0].values.values()[0].lexical()
        })
        .collect();
    assert_eq!(echoed, ["doc1", "doc2"]);
}

// ============================================================================
// Single decision
// ============================================================================

#[test]
fn single_expansion_merges_repeated_categories() {
    let request = [subject("alice"), resource("doc1"), resource("doc2")];

    let individual = single().expand(&request, false).unwrap();

    assert_eq!(individual.len(), 1);
    let bag = individual[0]
        .attribute(&AttributeKey::unissued(ids::CATEGORY_RESOURCE, ids::RESOURCE_ID))
        .unwrap();
    let values: Vec<&str> = bag.iter().map(|v| v.lexical()).collect();
    assert_eq!(values, ["doc1", "doc2"]);
}

#[test]
fn single_expansion_rejects_content_twice() {
    let request = [
        resource("doc1").with_content(ContentHandle::new(&b"<a/>"[..])),
        resource("doc2").with_content(ContentHandle::new(&b"<b/>"[..])),
    ];

    let err = single().expand(&request, false).unwrap_err();

    assert!(matches!(err, RequestError::DuplicateContent { .. }));
}

#[test]
fn issuer_copy_visible_in_expanded_request() {
    let request = [RawCategory::new(ids::CATEGORY_ACCESS_SUBJECT)
        .with_attribute(RawAttribute::string(ids::SUBJECT_ID, ["alice"]).with_issuer("idp"))];

    let individual = single().expand(&request, false).unwrap();

    let issued = AttributeKey::new(ids::CATEGORY_ACCESS_SUBJECT, Some("idp"), ids::SUBJECT_ID);
    let unissued = AttributeKey::unissued(ids::CATEGORY_ACCESS_SUBJECT, ids::SUBJECT_ID);
    assert!(individual[0].attribute(&issued).is_some());
    assert!(individual[0].attribute(&unissued).is_some());
}

// ============================================================================
// Property-based tests
// ============================================================================

const CATEGORIES: [&str; 4] = [
    ids::CATEGORY_ACCESS_SUBJECT,
    ids::CATEGORY_RESOURCE,
    ids::CATEGORY_ACTION,
    ids::CATEGORY_ENVIRONMENT,
];

proptest! {
    /// The number of individual requests is the product of the number of
    /// alternatives of every category.
    #[test]
    fn expansion_count_is_product_of_alternatives(
        occurrences in prop::collection::vec((0..CATEGORIES.len(), "[a-z]{1,6}"), 0..10),
        return_policy_id_list in any::<bool>(),
    ) {
        let request: Vec<RawCategory> = occurrences
            .iter()
            .map(|(category, value)| {
                RawCategory::new(CATEGORIES[*category])
                    .with_attribute(RawAttribute::string("attr", [value.as_str()]))
            })
            .collect();

        let individual = mdp().expand(&request, return_policy_id_list).unwrap();

        let expected: usize = (0..CATEGORIES.len())
            .map(|c| occurrences.iter().filter(|(category, _)| *category == c).count().max(1))
            .product();
        prop_assert_eq!(individual.len(), expected);
        for r in &individual {
            prop_assert_eq!(r.returns_policy_id_list(), return_policy_id_list);
            let present = CATEGORIES
                .iter()
                .enumerate()
                .filter(|(c, _)| occurrences.iter().any(|(category, _)| category == c))
                .count();
            prop_assert_eq!(r.attribute_count(), present);
        }
    }
}
