//! Lightweight markup scanning.
//!
//! Splits creative markup into inert HTML runs and script descriptors so
//! the validator can gate scripts individually and the renderer can
//! re-create them through element construction. This is a scanner, not a
//! full HTML parser: it only needs to find tag boundaries and attribute
//! lists, and it must never panic on attacker-controlled input.

/// Executable script element extracted from creative markup.
///
/// Attributes keep source order with lowercased names and verbatim
/// values; the body is verbatim. Both are needed to faithfully recreate
/// the element at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDescriptor {
    pub attributes: Vec<(String, String)>,
    pub text_content: String,
}

impl ScriptDescriptor {
    /// First value of the named attribute (names are lowercased).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }
}

/// One piece of a markup creative, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Html(String),
    Script(ScriptDescriptor),
}

/// Split markup into HTML runs and script descriptors.
///
/// Tag matching is ASCII case-insensitive. An unterminated script
/// element swallows the rest of the input as its body; a `<script`
/// without a closing `>` is left in the surrounding HTML run.
pub fn segment_markup(raw: &str) -> Vec<Segment> {
    let bytes = raw.as_bytes();
    let mut segments = Vec::new();
    let mut seg_start = 0;
    let mut search = 0;

    while let Some(open) = find_ci(bytes, b"<script", search) {
        let boundary = bytes.get(open + 7).copied();
        let is_tag = matches!(boundary, Some(b'>') | Some(b'/'))
            || boundary.map(|b| b.is_ascii_whitespace()).unwrap_or(false);
        if !is_tag {
            search = open + 7;
            continue;
        }

        let Some(tag_end) = find_byte(bytes, b'>', open + 7) else {
            // No closing '>' for the open tag; nothing more to extract
            search = open + 7;
            continue;
        };

        let attr_src = raw[open + 7..tag_end].trim_end();
        let self_closing = attr_src.ends_with('/');
        let attributes = parse_attributes(attr_src.trim_end_matches('/'));

        let (text_content, after) = if self_closing {
            (String::new(), tag_end + 1)
        } else if let Some(close) = find_ci(bytes, b"</script", tag_end + 1) {
            let close_end = find_byte(bytes, b'>', close)
                .map(|i| i + 1)
                .unwrap_or(bytes.len());
            (raw[tag_end + 1..close].to_string(), close_end)
        } else {
            (raw[tag_end + 1..].to_string(), bytes.len())
        };

        if open > seg_start {
            push_html(&mut segments, &raw[seg_start..open]);
        }
        segments.push(Segment::Script(ScriptDescriptor {
            attributes,
            text_content,
        }));
        seg_start = after;
        search = after;
    }

    if seg_start < raw.len() {
        push_html(&mut segments, &raw[seg_start..]);
    }
    segments
}

/// Attribute sets of every `<tag ...>` occurrence, for structural checks.
pub(crate) fn scan_tag_attributes(raw: &str, tag: &str) -> Vec<Vec<(String, String)>> {
    let bytes = raw.as_bytes();
    let needle = format!("<{}", tag);
    let needle = needle.as_bytes();
    let mut found = Vec::new();
    let mut search = 0;

    while let Some(open) = find_ci(bytes, needle, search) {
        let boundary = bytes.get(open + needle.len()).copied();
        let is_tag = matches!(boundary, Some(b'>') | Some(b'/'))
            || boundary.map(|b| b.is_ascii_whitespace()).unwrap_or(false);
        if !is_tag {
            search = open + needle.len();
            continue;
        }
        let Some(tag_end) = find_byte(bytes, b'>', open + needle.len()) else {
            break;
        };
        let attr_src = raw[open + needle.len()..tag_end].trim_end();
        found.push(parse_attributes(attr_src.trim_end_matches('/')));
        search = tag_end + 1;
    }
    found
}

fn push_html(segments: &mut Vec<Segment>, run: &str) {
    if !run.is_empty() {
        segments.push(Segment::Html(run.to_string()));
    }
}

/// ASCII case-insensitive substring search. Tag names are ASCII, and
/// match positions land on ASCII bytes, so they are valid char
/// boundaries for slicing the original input.
fn find_ci(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|i| i + from)
}

fn find_byte(haystack: &[u8], byte: u8, from: usize) -> Option<usize> {
    haystack[from.min(haystack.len())..]
        .iter()
        .position(|b| *b == byte)
        .map(|i| i + from)
}

/// Parse `name="value"` pairs. Handles single/double/unquoted values and
/// bare attributes (`async`). Names are lowercased, values verbatim.
fn parse_attributes(src: &str) -> Vec<(String, String)> {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < len {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }

        let name_start = i;
        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let name = src[name_start..i].to_lowercase();
        if name.is_empty() {
            i += 1;
            continue;
        }

        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < len && bytes[i] == b'=' {
            i += 1;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < len && bytes[i] != quote {
                    i += 1;
                }
                value = src[value_start..i].to_string();
                if i < len {
                    i += 1;
                }
            } else {
                let value_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = src[value_start..i].to_string();
            }
        }

        attrs.push((name, value));
    }
    attrs
}
