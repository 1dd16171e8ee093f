//! Precondition checks run before any request is sent

use serde_json::Value;
use uuid::Uuid;

use crate::error::{ConsoleError, ConsoleResult};
use crate::StacItem;

/// Fail unless `value` is a UUID
pub fn validate_uuid(value: &str) -> ConsoleResult<()> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|e| ConsoleError::Validation(format!("{value} is not a valid uuid: {e}")))
}

/// STAC ids from explicit ids, falling back to the ids of `items`
///
/// Explicit ids take precedence. Fails when neither yields any id.
pub fn stac_ids_or_items(
    stac_ids: Option<&[String]>,
    items: Option<&[StacItem]>,
) -> ConsoleResult<Vec<String>> {
    match (stac_ids, items) {
        (Some(ids), _) if !ids.is_empty() => Ok(ids.to_vec()),
        (_, Some(items)) if !items.is_empty() => Ok(items.iter().map(|i| i.id.clone()).collect()),
        _ => Err(ConsoleError::Validation(
            "Please provide stac_ids or items".to_string(),
        )),
    }
}

/// Fail unless `value` is a list of four numbers
pub fn validate_bbox(value: &Value) -> ConsoleResult<()> {
    let valid = value
        .as_array()
        .is_some_and(|coords| coords.len() == 4 && coords.iter().all(Value::is_number));
    if valid {
        Ok(())
    } else {
        Err(ConsoleError::Validation(format!(
            "Please specify as bbox list, e.g. [10, 10, 40, 40], got {value}"
        )))
    }
}
