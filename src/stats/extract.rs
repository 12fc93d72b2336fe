// src/stats/extract.rs
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use crate::models::status::OfflineReason;

lazy_static! {
    // <pre>, </pre> and <pre/> in any case.
    static ref WRAPPER_TAG: Regex = Regex::new(r"(?i)</?pre/?>").expect("wrapper tag pattern");
}

/// Strips the `<pre>` wrapper the status page puts around its JSON, then keeps whatever
/// sits between the first `{` and the last `}`.
pub fn extract_json(body: &str) -> Result<Value, OfflineReason> {
    let cleaned = WRAPPER_TAG.replace_all(body, "");

    let (first, last) = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(first), Some(last)) if first < last => (first, last),
        _ => return Err(OfflineReason::NoJsonFound),
    };

    serde_json::from_str(&cleaned[first..=last]).map_err(|_| OfflineReason::JsonParseFailure)
}
