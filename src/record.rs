//! Loosely-shaped records shared by CSV conversion and document updates.

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::UtilitiesError;

/// Ordered mapping from field name to JSON value.
pub type Record = Map<String, Value>;

/// Field used by [`sort_by`].
pub const NAME_FIELD: &str = "name";

/// Sort `items` in place by the upper-cased text of their `name` field and
/// return the same slice. Names compare by UTF-16 code units.
///
/// Every record must carry a text `name`; otherwise nothing is reordered and
/// the index of the first offending record is reported. Equal names keep
/// their input order.
pub fn sort_by(items: &mut [Record]) -> Result<&mut [Record], UtilitiesError> {
    if let Some(index) = items
        .iter()
        .position(|item| !matches!(item.get(NAME_FIELD), Some(Value::String(_))))
    {
        error!(index, "Record has no text `name` field, refusing to sort");
        return Err(UtilitiesError::MissingName { index });
    }

    items.sort_by_cached_key(|item| {
        item.get(NAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_uppercase()
            .encode_utf16()
            .collect::<Vec<u16>>()
    });
    debug!(count = items.len(), "Sorted records by name");
    Ok(items)
}
