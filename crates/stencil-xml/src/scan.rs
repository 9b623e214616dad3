//! Streaming scans over raw markup.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XmlError;

/// Largest numeric value of `attribute` on elements named `element`.
///
/// Both names are compared by local name, so `docPr` matches `wp:docPr`.
/// Non-numeric values are ignored; returns 0 when nothing matches.
///
/// # Errors
///
/// Returns an error if the markup is not well-formed.
pub fn max_attribute_value(xml: &str, element: &str, attribute: &str) -> Result<u64, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut max = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                if e.local_name().as_ref() == element.as_bytes()
                    && let Some(value) = numeric_attribute(&e, attribute)?
                {
                    max = max.max(value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(max)
}

fn numeric_attribute(e: &BytesStart, attribute: &str) -> Result<Option<u64>, XmlError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == attribute.as_bytes() {
            let value = std::str::from_utf8(&attr.value)?;
            return Ok(value.trim().parse().ok());
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAWINGS: &str = r#"<w:body>
        <wp:inline><wp:docPr id="3" name="Picture 3"/><pic:cNvPr id="7" name="a.png"/></wp:inline>
        <wp:anchor><wp:docPr id="10" name="Picture 10"></wp:docPr></wp:anchor>
        <wp:docPr id="x"/>
    </w:body>"#;

    #[test]
    fn test_max_attribute_value() {
        assert_eq!(max_attribute_value(DRAWINGS, "docPr", "id").unwrap(), 10);
        assert_eq!(max_attribute_value(DRAWINGS, "cNvPr", "id").unwrap(), 7);
    }

    #[test]
    fn test_max_attribute_value_without_matches() {
        assert_eq!(max_attribute_value("<w:body/>", "docPr", "id").unwrap(), 0);
    }
}
