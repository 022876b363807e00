//! Limit bound checks and request-value parsing.
//!
//! `-1` is the unlimited sentinel: it is compared as positive infinity but
//! stored unchanged.

use serde_json::Value;

use crate::error::ValidationError;
use crate::limit::UNLIMITED;
use crate::resource::QuotaResource;

/// Body keys that are never treated as resources.
pub const NON_QUOTA_KEYS: [&str; 3] = ["force", "id", "tenant_id"];

/// Map a limit onto a totally ordered domain where `-1` is infinity.
fn as_ceiling(value: i64) -> i128 {
    if value == UNLIMITED {
        i128::MAX
    } else {
        i128::from(value)
    }
}

/// Check a proposed limit against its settable range.
///
/// # Errors
///
/// - [`ValidationError::InvalidLimit`] when `limit < -1`
/// - [`ValidationError::LimitBelowUsage`] when `limit` is under `minimum`
/// - [`ValidationError::LimitExceedsParentBudget`] when `limit` is over `maximum`
pub fn validate_limit(
    resource: QuotaResource,
    limit: i64,
    minimum: i64,
    maximum: i64,
) -> Result<(), ValidationError> {
    if limit < UNLIMITED {
        return Err(ValidationError::InvalidLimit {
            resource: resource.to_string(),
            limit,
        });
    }
    if as_ceiling(limit) < as_ceiling(minimum) {
        return Err(ValidationError::LimitBelowUsage {
            resource: resource.to_string(),
            limit,
            minimum,
        });
    }
    if as_ceiling(limit) > as_ceiling(maximum) {
        return Err(ValidationError::LimitExceedsParentBudget {
            resource: resource.to_string(),
            limit,
            maximum,
        });
    }
    Ok(())
}

/// Parse the `force` flag of an update body.
///
/// Absent or `null` means `false`. Accepts JSON booleans and the literals
/// `true/false`, `1/0`, `yes/no`, `on/off`, `y/n`, `t/f` (case-insensitive).
///
/// # Errors
///
/// Returns [`ValidationError::InvalidForceFlag`] for any other value.
pub fn parse_force(value: Option<&Value>) -> Result<bool, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "y" | "t" => Ok(true),
            "false" | "0" | "no" | "off" | "n" | "f" => Ok(false),
            _ => Err(ValidationError::InvalidForceFlag(s.clone())),
        },
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(ValidationError::InvalidForceFlag(n.to_string())),
        },
        Some(other) => Err(ValidationError::InvalidForceFlag(other.to_string())),
    }
}

/// Parse a single limit value.
///
/// Returns `Ok(None)` when the value means "no change requested": `null` or
/// the empty string. `0` and `"0"` are real updates.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidInteger`] when the value is not an
/// integer or an integer string.
pub fn parse_limit_value(resource: &str, value: &Value) -> Result<Option<i64>, ValidationError> {
    let invalid = || ValidationError::InvalidInteger {
        resource: resource.to_owned(),
        value: value.to_string(),
    };
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid()),
        Value::Number(n) => n.as_i64().map(Some).ok_or_else(invalid),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(invalid()),
    }
}

fn is_no_change(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Resolve one `(key, value)` entry of an update body.
///
/// Returns `Ok(None)` for keys that are skipped: the non-quota keys and
/// empty values, whatever the key. `supported` is the set of resources
/// enabled under the active extensions; anything else is rejected.
///
/// # Errors
///
/// [`ValidationError::UnknownResource`] or [`ValidationError::InvalidInteger`].
pub fn parse_limit_entry(
    key: &str,
    value: &Value,
    supported: &[QuotaResource],
) -> Result<Option<(QuotaResource, i64)>, ValidationError> {
    if NON_QUOTA_KEYS.contains(&key) || is_no_change(value) {
        return Ok(None);
    }
    let resource: QuotaResource = key.parse()?;
    if !supported.contains(&resource) {
        return Err(ValidationError::UnknownResource(key.to_owned()));
    }
    Ok(parse_limit_value(key, value)?.map(|limit| (resource, limit)))
}
