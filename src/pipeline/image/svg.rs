//! SVG normalization through usvg.

/// Parse and rewrite compactly.
///
/// Files containing `<text` are returned unchanged: text is never
/// converted to paths.
pub fn optimize(bytes: &[u8]) -> Result<Vec<u8>, String> {
    if contains_text(bytes) {
        return Ok(bytes.to_vec());
    }

    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default()).map_err(|e| e.to_string())?;
    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };
    let mut out = tree.to_string(&write_options);
    if has_view_box(bytes) {
        restore_view_box(&mut out, tree.size());
    }
    Ok(out.into_bytes())
}

fn has_view_box(bytes: &[u8]) -> bool {
    use usvg::roxmltree::{Document, ParsingOptions};

    // same DOCTYPE tolerance as usvg
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| Document::parse_with_options(text, options).ok())
        .is_some_and(|doc| doc.root_element().has_attribute("viewBox"))
}

/// The writer folds `viewBox` into the root transform and emits only
/// `width`/`height`. Content is then in `0 0 width height` user space, so
/// that box keeps the image scalable without double-applying the source's.
fn restore_view_box(svg: &mut String, size: usvg::Size) {
    if let Some(at) = svg.find("<svg").map(|i| i + "<svg".len()) {
        svg.insert_str(at, &format!(r#" viewBox="0 0 {} {}""#, size.width(), size.height()));
    }
}

fn contains_text(bytes: &[u8]) -> bool {
    bytes.windows(5).any(|w| w == b"<text")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = r##"<?xml version="1.0"?>
<!-- exported by an editor -->
<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
    <metadata>editor state</metadata>
    <rect x="2" y="2" width="20" height="20" fill="#ff0000"/>
</svg>
"##;

    #[test]
    fn test_optimize_keeps_viewbox_and_drops_noise() {
        let out = String::from_utf8(optimize(ICON.as_bytes()).unwrap()).unwrap();
        assert!(out.contains("viewBox=\"0 0 24 24\""));
        assert!(!out.contains("exported by an editor"));
        assert!(!out.contains("metadata"));
    }

    #[test]
    fn test_scaled_viewbox_maps_to_written_user_space() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="48" height="48" viewBox="0 0 24 24"><rect x="2" y="2" width="20" height="20"/></svg>"#;
        let out = String::from_utf8(optimize(svg).unwrap()).unwrap();
        assert!(out.starts_with(r#"<svg viewBox="0 0 48 48" width="48" height="48""#));
        assert_eq!(out.matches("viewBox").count(), 1);
    }

    #[test]
    fn test_viewbox_survives_a_doctype() {
        let svg = br#"<?xml version="1.0"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 16 16"><rect width="8" height="8"/></svg>"#;
        let out = String::from_utf8(optimize(svg).unwrap()).unwrap();
        assert!(out.contains(r#"viewBox="0 0 16 16""#));
    }

    #[test]
    fn test_no_viewbox_is_added_when_absent() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10"/></svg>"#;
        let out = String::from_utf8(optimize(svg).unwrap()).unwrap();
        assert!(!out.contains("viewBox"));
    }

    #[test]
    fn test_text_is_copied_unchanged() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><text x="0" y="10">Hi</text></svg>"#;
        assert_eq!(optimize(svg).unwrap(), svg.to_vec());
    }

    #[test]
    fn test_invalid_svg_is_an_error() {
        assert!(optimize(b"<svg").is_err());
    }
}
