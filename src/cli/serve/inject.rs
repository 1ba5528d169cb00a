//! Live-reload client injection into served HTML.

use crate::embed::serve::script_tag;

/// Insert the client `<script>` before the last `</body>`, or append it
/// when the page has none.
pub fn inject_livereload(content: &[u8]) -> Vec<u8> {
    let script = script_tag();
    let script_bytes = script.as_bytes();

    const PATTERN: &[u8] = b"</body>";

    let mut result = Vec::with_capacity(content.len() + script_bytes.len());
    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script_bytes);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(script_bytes);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_before_closing_body() {
        let html = b"<html><body><p>hi</p></BODY></html>";
        let out = String::from_utf8(inject_livereload(html)).unwrap();
        let script = script_tag();
        assert!(out.contains(&format!("<p>hi</p>{script}</BODY>")));
    }

    #[test]
    fn test_appended_without_body() {
        let out = String::from_utf8(inject_livereload(b"<p>fragment</p>")).unwrap();
        assert!(out.starts_with("<p>fragment</p>"));
        assert!(out.ends_with(&script_tag()));
    }
}
