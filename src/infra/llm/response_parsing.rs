/// Vendor error text is clipped to this many characters before it is classified or logged.
const VENDOR_MESSAGE_LIMIT: usize = 256;

pub(crate) fn clip_vendor_message(body: &str) -> String {
    body.trim()
        .chars()
        .map(|ch| if ch == '\n' { ' ' } else { ch })
        .take(VENDOR_MESSAGE_LIMIT)
        .collect()
}

/// Returns the JSON object carried by a model answer.
///
/// A ```` ```json ```` or bare ```` ``` ```` opening fence and a closing fence are
/// removed first, whether or not they sit on their own lines. Whatever remains is
/// narrowed to the span between the first `{` and the last `}`.
pub(crate) fn json_object_text(text: &str) -> Option<&str> {
    let body = strip_code_fence(text.trim());
    let open = body.find('{')?;
    let close = body.rfind('}')?;
    if open > close {
        return None;
    }
    Some(&body[open..=close])
}

fn strip_code_fence(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

pub(crate) fn trimmed_non_blank(value: &str) -> Option<String> {
    Some(value.trim())
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}
