//! Best-effort structured extraction from chatty model output.
//!
//! Models frequently wrap JSON payloads in commentary or markdown fences.
//! Rather than demanding a fully-JSON response, we scan for the first
//! balanced brace-delimited object that parses, and hand that back.

/// Return the first balanced `{...}` block in `text` that parses as a JSON
/// object. String literals and escapes are honored while balancing, so
/// braces inside quoted values never confuse the scan.
pub fn first_object(text: &str) -> Option<serde_json::Value> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(open) = find_byte(bytes, b'{', start) {
        if let Some(end) = balanced_end(bytes, open) {
            let candidate = &text[open..=end];
            if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(candidate) {
                return Some(value);
            }
        }
        start = open + 1;
    }

    None
}

fn find_byte(bytes: &[u8], needle: u8, from: usize) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|i| from + i)
}

/// Index of the byte closing the object that opens at `open`, or None when
/// the braces never balance.
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}
