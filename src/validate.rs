use crate::error::QuizError;
use regex::Regex;
use std::sync::LazyLock;

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("valid regex"));

/// Turn the raw `<id>` argument of a command into a quiz key.
///
/// Parsing is permissive: leading whitespace and an optional sign are accepted, and
/// anything after the leading run of digits is discarded, so `"12xy"` yields `12`.
/// Whether a quiz with that id exists is left to the caller.
pub fn validate_id(raw: Option<&str>) -> Result<i64, QuizError> {
    let raw = raw.ok_or(QuizError::MissingArgument)?;
    let digits = LEADING_INT
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .ok_or(QuizError::InvalidArgument)?;
    digits
        .as_str()
        .parse::<i64>()
        .map_err(|_| QuizError::InvalidArgument)
}
