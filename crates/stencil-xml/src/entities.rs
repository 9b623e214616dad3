//! Named HTML entities in markup that is otherwise XML.
//!
//! HTML content supplied through the context may use entities such as
//! `&nbsp;` that an XML reader rejects. The five predefined XML entities are
//! left alone so the reader still decodes them.

use std::sync::LazyLock;

use regex::Regex;

static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// Entity name to character, sorted by name.
const HTML_ENTITIES: &[(&str, char)] = &[
    ("Dagger", '\u{2021}'),
    ("bull", '\u{2022}'),
    ("cent", '\u{00a2}'),
    ("copy", '\u{00a9}'),
    ("dagger", '\u{2020}'),
    ("darr", '\u{2193}'),
    ("deg", '\u{00b0}'),
    ("divide", '\u{00f7}'),
    ("euro", '\u{20ac}'),
    ("frac12", '\u{00bd}'),
    ("frac14", '\u{00bc}'),
    ("frac34", '\u{00be}'),
    ("ge", '\u{2265}'),
    ("hellip", '\u{2026}'),
    ("iexcl", '\u{00a1}'),
    ("iquest", '\u{00bf}'),
    ("laquo", '\u{00ab}'),
    ("larr", '\u{2190}'),
    ("ldquo", '\u{201c}'),
    ("le", '\u{2264}'),
    ("lsquo", '\u{2018}'),
    ("mdash", '\u{2014}'),
    ("micro", '\u{00b5}'),
    ("middot", '\u{00b7}'),
    ("nbsp", '\u{00a0}'),
    ("ndash", '\u{2013}'),
    ("ne", '\u{2260}'),
    ("para", '\u{00b6}'),
    ("plusmn", '\u{00b1}'),
    ("pound", '\u{00a3}'),
    ("raquo", '\u{00bb}'),
    ("rarr", '\u{2192}'),
    ("rdquo", '\u{201d}'),
    ("reg", '\u{00ae}'),
    ("rsquo", '\u{2019}'),
    ("sect", '\u{00a7}'),
    ("shy", '\u{00ad}'),
    ("sup2", '\u{00b2}'),
    ("sup3", '\u{00b3}'),
    ("times", '\u{00d7}'),
    ("trade", '\u{2122}'),
    ("uarr", '\u{2191}'),
    ("yen", '\u{00a5}'),
];

/// Replace named HTML entities with their characters.
///
/// Unknown entities and the XML-predefined ones (`amp`, `lt`, `gt`, `quot`,
/// `apos`) are kept verbatim.
pub fn convert_html_entities(markup: &str) -> String {
    ENTITY_PATTERN
        .replace_all(markup, |caps: &regex::Captures| {
            lookup(&caps[1]).map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}

fn lookup(name: &str) -> Option<char> {
    HTML_ENTITIES
        .binary_search_by(|(entity, _)| entity.cmp(&name))
        .ok()
        .map(|index| HTML_ENTITIES[index].1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_is_sorted() {
        assert!(HTML_ENTITIES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_convert_known_entities() {
        assert_eq!(
            convert_html_entities("a&nbsp;b&mdash;c &copy;"),
            "a\u{00a0}b\u{2014}c \u{00a9}"
        );
    }

    #[test]
    fn test_xml_entities_untouched() {
        assert_eq!(convert_html_entities("&amp;&lt;&gt;&quot;"), "&amp;&lt;&gt;&quot;");
    }

    #[test]
    fn test_unknown_entity_untouched() {
        assert_eq!(convert_html_entities("&bogus;"), "&bogus;");
    }
}
