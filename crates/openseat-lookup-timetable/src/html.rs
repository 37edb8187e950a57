//! Minimal tolerant HTML scanning
//!
//! The timetable returns loosely formed markup, so extraction works on
//! known blocks rather than a full DOM:
//! - case-insensitive tag matching
//! - quoted attribute values may contain `>`
//! - comments, doctypes and void elements are skipped
//! - a missing `</td>`/`</tr>` is closed by the next sibling of the same tag
//!
//! Every function returns slices of the input; nothing is allocated until
//! [`text_content`] flattens a fragment.

/// Tags that never have content
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Tags whose end tag is commonly omitted; a sibling start tag closes them
const SELF_CLOSING_SIBLINGS: &[&str] = &["td", "th", "tr", "li", "p", "option"];

#[derive(Debug)]
struct Tag<'a> {
    /// Lowercased tag name
    name: String,
    /// Raw attribute text between the name and `>`
    attrs: &'a str,
    /// Byte offset of `<`
    start: usize,
    /// Byte offset just past `>`
    end: usize,
    closing: bool,
    self_closing: bool,
}

impl Tag<'_> {
    fn is_void(&self) -> bool {
        self.self_closing || VOID_TAGS.contains(&self.name.as_str())
    }

    /// Whether the `class` attribute lists `class` as one of its tokens
    fn has_class(&self, class: &str) -> bool {
        attribute(self.attrs, "class")
            .map(|value| value.split_ascii_whitespace().any(|c| c.eq_ignore_ascii_case(class)))
            .unwrap_or(false)
    }
}

/// Iterate over start and end tags in document order
fn tags(html: &str) -> impl Iterator<Item = Tag<'_>> {
    let bytes = html.as_bytes();
    let mut pos = 0;

    std::iter::from_fn(move || {
        loop {
            let open = pos + html.get(pos..)?.find('<')?;

            // Comments, doctypes and processing instructions carry no
            // elements; they are yielded as void markup so text skips them
            let markup_end = if html[open..].starts_with("<!--") {
                Some(html[open + 4..].find("-->").map_or(html.len(), |i| open + 4 + i + 3))
            } else if matches!(bytes.get(open + 1), Some(b'!') | Some(b'?')) {
                Some(html[open..].find('>').map_or(html.len(), |i| open + i + 1))
            } else {
                None
            };
            if let Some(end) = markup_end {
                pos = end;
                return Some(Tag {
                    name: "!".to_string(),
                    attrs: "",
                    start: open,
                    end,
                    closing: false,
                    self_closing: true,
                });
            }

            let mut cursor = open + 1;
            let closing = bytes.get(cursor) == Some(&b'/');
            if closing {
                cursor += 1;
            }

            let name_start = cursor;
            while cursor < bytes.len() && bytes[cursor].is_ascii_alphanumeric() {
                cursor += 1;
            }

            // A stray `<` in text
            if cursor == name_start {
                pos = open + 1;
                continue;
            }
            let name = html[name_start..cursor].to_ascii_lowercase();

            let attrs_start = cursor;
            let mut quote: Option<u8> = None;
            while cursor < bytes.len() {
                let b = bytes[cursor];
                match quote {
                    Some(q) if b == q => quote = None,
                    Some(_) => {}
                    None if b == b'"' || b == b'\'' => quote = Some(b),
                    None if b == b'>' => break,
                    None => {}
                }
                cursor += 1;
            }

            let attrs_end = cursor.min(bytes.len());
            let end = (cursor + 1).min(bytes.len());
            let attrs = html[attrs_start..attrs_end].trim();
            let self_closing = attrs.ends_with('/');
            pos = end;

            return Some(Tag {
                name,
                attrs,
                start: open,
                end,
                closing,
                self_closing,
            });
        }
    })
}

/// Value of the named attribute in raw attribute text
fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let bytes = attrs.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let key_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let key = &attrs[key_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            if key.eq_ignore_ascii_case(name) {
                return Some("");
            }
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = match bytes.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let value_start = i + 1;
                let value_end = attrs[value_start..]
                    .find(q as char)
                    .map(|n| value_start + n)
                    .unwrap_or(attrs.len());
                i = (value_end + 1).min(attrs.len());
                &attrs[value_start..value_end]
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                &attrs[value_start..i]
            }
        };

        if key.eq_ignore_ascii_case(name) {
            return Some(value);
        }
    }

    None
}

/// Inner HTML of every element whose start tag satisfies `matches`
///
/// With `descend` the scan continues inside a matched element, so nested
/// matches are returned too. Without it, scanning resumes after the
/// element ends (direct-children style).
fn collect<'a>(html: &'a str, descend: bool, matches: impl Fn(&Tag<'_>) -> bool) -> Vec<&'a str> {
    let all: Vec<Tag<'a>> = tags(html).collect();
    let mut found = Vec::new();
    let mut i = 0;

    while i < all.len() {
        let open = &all[i];
        if open.closing || open.is_void() || !matches(open) {
            i += 1;
            continue;
        }

        let content_end = close_of(&all, i).unwrap_or(html.len());
        found.push(&html[open.end..content_end.max(open.end)]);

        if descend {
            i += 1;
        } else {
            i = all
                .iter()
                .position(|t| t.start >= content_end)
                .unwrap_or(all.len());
        }
    }

    found
}

/// Byte offset where the element opened at `all[index]` ends its content
fn close_of(all: &[Tag<'_>], index: usize) -> Option<usize> {
    let name = all[index].name.as_str();
    let implicit = SELF_CLOSING_SIBLINGS.contains(&name);
    // Same-name nesting
    let mut depth = 0usize;
    // Nested tables and lists; sibling rules do not apply inside them
    let mut scope = 0usize;

    for tag in &all[index + 1..] {
        if tag.is_void() {
            continue;
        }

        if implicit && tag.name != name && is_scope(&tag.name) {
            if !tag.closing {
                scope += 1;
            } else if scope > 0 {
                scope -= 1;
            } else if is_container_of(&tag.name, name) {
                return Some(tag.start);
            }
            continue;
        }

        if scope > 0 {
            continue;
        }

        if tag.name != name {
            // A parent ending also ends an unclosed cell or row
            if implicit && tag.closing && is_container_of(&tag.name, name) {
                return Some(tag.start);
            }
            continue;
        }

        if tag.closing {
            if depth == 0 {
                return Some(tag.start);
            }
            depth -= 1;
        } else if implicit {
            return Some(tag.start);
        } else {
            depth += 1;
        }
    }

    None
}

fn is_scope(name: &str) -> bool {
    matches!(name, "table" | "ul" | "ol" | "select")
}

fn is_container_of(parent: &str, child: &str) -> bool {
    match child {
        "td" | "th" => matches!(parent, "tr" | "table" | "tbody" | "thead" | "tfoot"),
        "tr" => matches!(parent, "table" | "tbody" | "thead" | "tfoot"),
        "li" => matches!(parent, "ul" | "ol"),
        "option" => matches!(parent, "select"),
        _ => false,
    }
}

/// Inner HTML of every element carrying `class`, nested ones included
pub fn class_blocks<'a>(html: &'a str, class: &str) -> Vec<&'a str> {
    collect(html, true, |tag| tag.has_class(class))
}

/// Inner HTML of every `tag` element in the fragment, nested ones included
pub fn descendants<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let tag = tag.to_ascii_lowercase();
    collect(html, true, |t| t.name == tag)
}

/// Inner HTML of the outermost `tag` elements in the fragment
pub fn children<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let tag = tag.to_ascii_lowercase();
    collect(html, false, |t| t.name == tag)
}

/// Text of a fragment with tags removed and entities decoded
pub fn text_content(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut last = 0;

    for tag in tags(html) {
        text.push_str(&html[last..tag.start]);
        last = tag.end;
    }
    text.push_str(&html[last.min(html.len())..]);

    decode_entities(&text)
}

/// Collapse whitespace runs into single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);

    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }

    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_blocks_match_class_token_case_insensitively() {
        let html = r#"<TABLE Class="plain DataEntryTable"><tr><td>1</td></tr></TABLE>
                      <table class="other"><tr><td>2</td></tr></table>"#;

        let blocks = class_blocks(html, "dataentrytable");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0], "<tr><td>1</td></tr>");
    }

    #[test]
    fn test_class_must_be_whole_token() {
        let html = r#"<table class="dataentrytable-wide"><tr><td>1</td></tr></table>"#;
        assert!(class_blocks(html, "dataentrytable").is_empty());
    }

    #[test]
    fn test_nested_same_tag_is_balanced() {
        let html = "<div class=\"x\">a<div>b</div>c</div>d";
        assert_eq!(class_blocks(html, "x"), vec!["a<div>b</div>c"]);
    }

    #[test]
    fn test_children_skips_nested_cells() {
        let row = "<td>1</td><td><table><tr><td>inner</td></tr></table></td><td>3</td>";
        let cells = children(row, "td");
        assert_eq!(cells.len(), 3);
        assert_eq!(text_content(cells[2]), "3");
    }

    #[test]
    fn test_unclosed_cells_end_at_next_sibling() {
        let html = "<table><tr><td>1<td>2<td>3</tr><tr><td>4</table>";
        let rows = descendants(html, "tr");
        assert_eq!(rows.len(), 2);

        let texts: Vec<_> = children(rows[0], "td").into_iter().map(text_content).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        assert_eq!(text_content(children(rows[1], "td")[0]), "4");
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let html = r#"<td title="a > b">x</td>"#;
        assert_eq!(children(html, "td"), vec!["x"]);
    }

    #[test]
    fn test_comments_and_void_tags_are_skipped() {
        let html = "<td><!-- <td>not a cell</td> -->a<br>b<img src=\"x\"/></td>";
        let cells = children(html, "td");
        assert_eq!(cells.len(), 1);
        assert_eq!(text_content(cells[0]), "ab");
    }

    #[test]
    fn test_text_content_decodes_entities() {
        assert_eq!(
            text_content("<b>Data &amp; Algorithms</b> &#38; &#x26; &lt;x&gt; &bogus; 5 & 6"),
            "Data & Algorithms & & <x> &bogus; 5 & 6"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("\n  Intro to\u{a0}\n Programming  "),
            "Intro to Programming"
        );
    }

    #[test]
    fn test_attribute_forms() {
        assert_eq!(attribute(r#"a="1" b='2' c=3 d"#, "b"), Some("2"));
        assert_eq!(attribute(r#"a="1" b='2' c=3 d"#, "c"), Some("3"));
        assert_eq!(attribute(r#"a="1" b='2' c=3 d"#, "d"), Some(""));
        assert_eq!(attribute(r#"a="1""#, "class"), None);
    }
}
