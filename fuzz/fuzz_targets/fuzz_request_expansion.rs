#![no_main]

use std::sync::Arc;

use abacus_request::{
    AttributeMerger, MergePolicy, MultipleDecisionExpander, RawAttribute, RawCategory,
    RequestExpander, SingleDecisionExpander, StandardCategoryParser, StandardValueFactory,
};
use abacus_types::{ContentHandle, Datatype, ids};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

const CATEGORIES: [&str; 4] = [
    ids::CATEGORY_ACCESS_SUBJECT,
    ids::CATEGORY_RESOURCE,
    ids::CATEGORY_ACTION,
    ids::CATEGORY_ENVIRONMENT,
];

const ATTRIBUTE_IDS: [&str; 4] = [
    ids::SUBJECT_ID,
    ids::RESOURCE_ID,
    ids::RESOURCE_SCOPE,
    ids::ACTION_ID,
];

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzPolicy {
    Strict,
    LaxNoCopy,
    LaxIssuerCopy,
}

impl From<FuzzPolicy> for MergePolicy {
    fn from(f: FuzzPolicy) -> Self {
        match f {
            FuzzPolicy::Strict => MergePolicy::Strict,
            FuzzPolicy::LaxNoCopy => MergePolicy::LaxNoCopy,
            FuzzPolicy::LaxIssuerCopy => MergePolicy::LaxIssuerCopy,
        }
    }
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzDatatype {
    String,
    Boolean,
    Integer,
    Double,
    AnyUri,
}

impl From<FuzzDatatype> for Datatype {
    fn from(f: FuzzDatatype) -> Self {
        match f {
            FuzzDatatype::String => Datatype::string(),
            FuzzDatatype::Boolean => Datatype::boolean(),
            FuzzDatatype::Integer => Datatype::integer(),
            FuzzDatatype::Double => Datatype::double(),
            FuzzDatatype::AnyUri => Datatype::any_uri(),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzAttribute {
    id: u8,
    issuer: Option<String>,
    datatype: FuzzDatatype,
    values: Vec<String>,
    include_in_result: bool,
}

#[derive(Debug, Arbitrary)]
struct FuzzCategory {
    category: u8,
    attributes: Vec<FuzzAttribute>,
    content: Option<Vec<u8>>,
}

#[derive(Debug, Arbitrary)]
struct Input {
    policy: FuzzPolicy,
    return_policy_id_list: bool,
    categories: Vec<FuzzCategory>,
}

fn to_raw(category: &FuzzCategory) -> RawCategory {
    let mut raw = RawCategory::new(CATEGORIES[usize::from(category.category) % CATEGORIES.len()]);
    for attribute in &category.attributes {
        let mut raw_attribute = RawAttribute::new(
            ATTRIBUTE_IDS[usize::from(attribute.id) % ATTRIBUTE_IDS.len()],
            attribute.datatype.into(),
            attribute.values.iter().cloned(),
        );
        raw_attribute.issuer = attribute.issuer.clone();
        raw_attribute.include_in_result = attribute.include_in_result;
        raw = raw.with_attribute(raw_attribute);
    }
    if let Some(content) = &category.content {
        raw = raw.with_content(ContentHandle::new(content.clone()));
    }
    raw
}

fuzz_target!(|input: Input| {
    // Bound the cross product.
    if input.categories.len() > 12 {
        return;
    }
    let occurrences: Vec<RawCategory> = input.categories.iter().map(to_raw).collect();

    let parser = StandardCategoryParser::new(AttributeMerger::new(
        input.policy.into(),
        Arc::new(StandardValueFactory),
    ));
    let multiple = MultipleDecisionExpander::new(parser.clone());
    let single = SingleDecisionExpander::new(parser);

    if let Ok(requests) = multiple.expand(&occurrences, input.return_policy_id_list) {
        assert!(!requests.is_empty());
        for request in &requests {
            assert_eq!(request.returns_policy_id_list(), input.return_policy_id_list);
        }
    }

    if let Ok(requests) = single.expand(&occurrences, input.return_policy_id_list) {
        assert_eq!(requests.len(), 1);
    }
});
