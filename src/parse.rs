use tracing::debug;

/// A single resolved byte range. Both bounds are inclusive offsets into the
/// content, so `start == end` names exactly one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        ByteRange { start, end }
    }

    /// Number of bytes the range covers.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// A `Range` header that names a window the content cannot satisfy, carrying
/// the offending raw bounds. An unset bound was absent from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid start and end values: {}-{}", fmt_bound(.start), fmt_bound(.end))]
pub struct RangeParseError {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

fn fmt_bound(bound: &Option<u64>) -> String {
    match bound {
        Some(value) => value.to_string(),
        None => "?".to_string(),
    }
}

/// Parses a raw `Range` header against the total content size.
///
/// Returns `Ok(None)` when no range applies: the header is missing or empty,
/// or the content itself is empty. Returns `Ok(Some(range))` for a single
/// satisfiable `bytes=<start>-<end>` range, where either bound may be
/// omitted: `bytes=5-` runs to the last byte and `bytes=-5` selects the last
/// five. Every other header fails with [`RangeParseError`].
///
/// Every returned range satisfies `start <= end < total_size`.
pub fn parse_range_header(
    header: Option<&str>,
    total_size: u64,
) -> Result<Option<ByteRange>, RangeParseError> {
    let raw = match header {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };

    if total_size == 0 {
        debug!(header = raw, "content is empty, ignoring range header");
        return Ok(None);
    }

    let (start, end) = split_bounds(raw).unwrap_or((None, None));
    let last = total_size - 1;

    let range = match (start, end) {
        (Some(start), Some(end)) => {
            // the end bound is checked before clamping: an explicit end past
            // the content is unsatisfiable, not a request for the remainder
            if start > end || end > last {
                return Err(RangeParseError { start: Some(start), end: Some(end) });
            }
            ByteRange { start, end }
        }
        (Some(start), None) => {
            if start > last {
                return Err(RangeParseError { start: Some(start), end: None });
            }
            ByteRange { start, end: last }
        }
        (None, Some(suffix)) => {
            let start = total_size.saturating_sub(suffix);
            if start > last {
                return Err(RangeParseError { start: None, end: Some(suffix) });
            }
            ByteRange { start, end: last }
        }
        (None, None) => return Err(RangeParseError { start: None, end: None }),
    };

    debug!(start = range.start, end = range.end, total_size, "resolved byte range");
    Ok(Some(range))
}

/// Splits `bytes=<start>-<end>` into its optional bounds. `None` means the
/// header does not match the single-range form at all.
fn split_bounds(raw: &str) -> Option<(Option<u64>, Option<u64>)> {
    let rest = raw.strip_prefix("bytes=")?;
    let (start, end) = rest.split_once('-')?;
    Some((parse_bound(start)?, parse_bound(end)?))
}

fn parse_bound(input: &str) -> Option<Option<u64>> {
    if input.is_empty() {
        return Some(None);
    }
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // a digit run too large for u64 counts as malformed
    input.parse().ok().map(Some)
}
