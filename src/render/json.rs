use serde::Serialize;

use crate::error::RxLabelError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, RxLabelError> {
    Ok(serde_json::to_string_pretty(value)?)
}
