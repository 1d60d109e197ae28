//! Attribute value factories.
//!
//! A factory turns the raw text of an `AttributeValue` element into a typed
//! [`AttributeValue`] in canonical lexical form, or rejects it.

use abacus_types::{AttributeValue, Datatype, XPathContext, ids};

use crate::error::{RequestError, Result};

/// Builds typed values from raw request text.
pub trait ValueFactory: Send + Sync {
    /// Creates a value of `datatype` from `raw`.
    ///
    /// `xpath_context` is the content of the category the attribute was
    /// declared in, if any; only XPath-valued datatypes need it.
    fn create(
        &self,
        datatype: &Datatype,
        raw: &str,
        xpath_context: Option<&XPathContext>,
    ) -> Result<AttributeValue>;
}

/// Factory for the XACML core datatypes handled by this engine:
/// `string`, `boolean`, `integer`, `double`, `anyURI` and `xpathExpression`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardValueFactory;

impl ValueFactory for StandardValueFactory {
    fn create(
        &self,
        datatype: &Datatype,
        raw: &str,
        xpath_context: Option<&XPathContext>,
    ) -> Result<AttributeValue> {
        let invalid = |reason: &str| RequestError::InvalidValue {
            datatype: datatype.clone(),
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let lexical = match datatype.as_str() {
            ids::XSD_STRING => raw.to_string(),
            ids::XSD_BOOLEAN => match raw.trim() {
                "true" | "1" => "true".to_string(),
                "false" | "0" => "false".to_string(),
                _ => return Err(invalid("expected true, false, 1 or 0")),
            },
            ids::XSD_INTEGER => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| invalid("not a 64-bit integer"))?
                .to_string(),
            ids::XSD_DOUBLE => canonical_double(raw.trim()).ok_or_else(|| invalid("not a double"))?,
            ids::XSD_ANY_URI => {
                let uri = raw.trim();
                if uri.chars().any(char::is_whitespace) {
                    return Err(invalid("URI contains whitespace"));
                }
                uri.to_string()
            }
            ids::XPATH_EXPRESSION => {
                if xpath_context.is_none() {
                    return Err(invalid(
                        "XPath expressions require a Content element in the same category",
                    ));
                }
                raw.trim().to_string()
            }
            _ => return Err(RequestError::UnsupportedDatatype(datatype.clone())),
        };

        Ok(AttributeValue::new(datatype.clone(), lexical))
    }
}

/// Validates an `xs:double` lexical form, returning it unchanged.
///
/// Rust's float parser also accepts `inf` and `infinity`, which XML Schema
/// does not, so the special values are matched explicitly.
fn canonical_double(text: &str) -> Option<String> {
    match text {
        "INF" | "-INF" | "NaN" => Some(text.to_string()),
        _ if text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
            && text.parse::<f64>().is_ok() =>
        {
            Some(text.to_string())
        }
        _ => None,
    }
}
