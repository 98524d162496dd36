//! HTML tokenization and tree building.

use jl_dom::Document;
use jl_dom::NodeId;
use jl_dom::RAW_TEXT_ELEMENTS;
use jl_dom::VOID_ELEMENTS;

/// Parses raw HTML into a DOM document.
///
/// This is a forgiving tree builder, not a standards-complete one. Unmatched end
/// tags are ignored and unclosed elements are closed at end of input; implied
/// `<html>`/`<body>` elements are never synthesized.
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn parse(&self, input: &str) -> Document {
        let mut builder = TreeBuilder::new();
        let bytes = input.as_bytes();
        let mut idx = 0_usize;

        while idx < bytes.len() {
            if bytes[idx] != b'<' {
                let next = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
                builder.text(&decode_entities(&input[idx..next]));
                idx = next;
                continue;
            }

            if starts_with(bytes, idx, b"<!--") {
                let body_start = idx.saturating_add(4);
                let end = find_subslice(bytes, body_start, b"-->");
                let body_end = end.unwrap_or(bytes.len());
                builder.comment(&input[body_start.min(body_end)..body_end]);
                idx = end.map(|end| end.saturating_add(3)).unwrap_or(bytes.len());
                continue;
            }

            if starts_with(bytes, idx, b"<!") {
                idx = skip_to_gt(bytes, idx.saturating_add(2));
                continue;
            }

            if starts_with(bytes, idx, b"<?") {
                idx = skip_processing_instruction(bytes, idx);
                continue;
            }

            let Some((tag, next_idx)) = parse_tag(input, idx) else {
                builder.text("<");
                idx = idx.saturating_add(1);
                continue;
            };

            if tag.is_end {
                builder.end_tag(&tag.name);
                idx = next_idx;
                continue;
            }

            builder.start_tag(&tag);

            if tag.name == "title" && !tag.self_closing {
                let (raw_title, after_title) =
                    read_raw_text_until_end_tag(input, next_idx, "title");
                let decoded = decode_entities(raw_title);
                builder.text(&decoded);
                builder.end_tag("title");
                if builder.document.title.is_empty() {
                    builder.document.title = collapse_whitespace(&decoded);
                }
                idx = after_title;
                continue;
            }

            if !tag.self_closing && RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                let (raw, after_raw) = read_raw_text_until_end_tag(input, next_idx, &tag.name);
                builder.text(raw);
                builder.end_tag(&tag.name);
                idx = after_raw;
                continue;
            }

            idx = next_idx;
        }

        builder.document
    }
}

struct TreeBuilder {
    document: Document,
    open: Vec<(NodeId, String)>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            document: Document::empty(),
            open: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open
            .last()
            .map(|(id, _)| *id)
            .unwrap_or(self.document.root)
    }

    fn start_tag(&mut self, tag: &ParsedTag) {
        let element = self.document.create_element(&tag.name);
        for (name, value) in &tag.attributes {
            if let Err(error) = self.document.set_attribute(element, name, value) {
                log::warn!("dropping attribute `{name}` on <{}>: {error}", tag.name);
            }
        }
        let parent = self.current();
        self.insert(parent, element);

        if !tag.self_closing && !VOID_ELEMENTS.contains(&tag.name.as_str()) {
            self.open.push((element, tag.name.clone()));
        }
    }

    fn end_tag(&mut self, name: &str) {
        let Some(position) = self.open.iter().rposition(|(_, open)| open == name) else {
            return;
        };
        self.open.truncate(position);
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        let node = self.document.create_text(text);
        self.insert(parent, node);
    }

    fn comment(&mut self, text: &str) {
        let parent = self.current();
        let node = self.document.create_comment(text);
        self.insert(parent, node);
    }

    /// Appends `node` under `parent`; a rejected insertion leaves `node` detached.
    fn insert(&mut self, parent: NodeId, node: NodeId) -> bool {
        match self.document.append_child(parent, node) {
            Ok(()) => true,
            Err(error) => {
                log::warn!("dropping node {node} under {parent}: {error}");
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTag {
    name: String,
    is_end: bool,
    self_closing: bool,
    attributes: Vec<(String, String)>,
}

fn parse_tag(input: &str, start: usize) -> Option<(ParsedTag, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start).copied() != Some(b'<') {
        return None;
    }

    let mut idx = start.saturating_add(1);
    let mut is_end = false;
    if bytes.get(idx).copied() == Some(b'/') {
        is_end = true;
        idx = idx.saturating_add(1);
    }

    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }

    if idx == name_start {
        return None;
    }

    let name = input[name_start..idx].to_ascii_lowercase();
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        idx = skip_spaces(bytes, idx);
        match bytes.get(idx).copied() {
            None => return None,
            Some(b'>') => break,
            Some(b'/') => {
                idx = idx.saturating_add(1);
                if bytes.get(idx).copied() == Some(b'>') {
                    self_closing = true;
                    break;
                }
                continue;
            }
            Some(_) => {}
        }

        let attr_start = idx;
        while idx < bytes.len() && !is_attribute_name_end(bytes[idx]) {
            idx = idx.saturating_add(1);
        }
        if idx == attr_start {
            idx = idx.saturating_add(1);
            continue;
        }
        let attr_name = input[attr_start..idx].to_ascii_lowercase();

        idx = skip_spaces(bytes, idx);
        let mut value = String::new();
        if bytes.get(idx).copied() == Some(b'=') {
            idx = skip_spaces(bytes, idx.saturating_add(1));
            let (raw, after) = read_attribute_value(input, idx)?;
            value = decode_entities(raw);
            idx = after;
        }

        if !attributes.iter().any(|(existing, _)| *existing == attr_name) {
            attributes.push((attr_name, value));
        }
    }

    Some((
        ParsedTag {
            name,
            is_end,
            self_closing,
            attributes: if is_end { Vec::new() } else { attributes },
        },
        idx.saturating_add(1),
    ))
}

fn read_attribute_value(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    match bytes.get(start).copied() {
        Some(quote @ (b'"' | b'\'')) => {
            let value_start = start.saturating_add(1);
            let end = find_byte(bytes, value_start, quote)?;
            Some((&input[value_start..end], end.saturating_add(1)))
        }
        Some(_) => {
            let mut idx = start;
            while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() && bytes[idx] != b'>' {
                idx = idx.saturating_add(1);
            }
            Some((&input[start..idx], idx))
        }
        None => None,
    }
}

/// Decodes the named references authors actually write in attribute values
/// plus numeric references. Unknown references are kept verbatim.
fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_owned();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let Some(semi) = candidate.find(';').filter(|semi| *semi <= 10) else {
            out.push('&');
            rest = &candidate[1..];
            continue;
        };

        let reference = &candidate[1..semi];
        match decode_reference(reference) {
            Some(ch) => {
                out.push(ch);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(reference: &str) -> Option<char> {
    match reference {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = reference.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn read_raw_text_until_end_tag<'a>(
    input: &'a str,
    start: usize,
    tag_name: &str,
) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
            && tag_name_boundary(bytes, idx.saturating_add(2 + tag_bytes.len()))
        {
            if let Some((_, end_idx)) = parse_tag(input, idx) {
                return (&input[start..idx], end_idx);
            }
        }

        idx = idx.saturating_add(1);
    }

    (&input[start.min(bytes.len())..], bytes.len())
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn skip_processing_instruction(bytes: &[u8], start: usize) -> usize {
    if let Some(end) = find_subslice(bytes, start.saturating_add(2), b"?>") {
        return end.saturating_add(2);
    }

    skip_to_gt(bytes, start.saturating_add(2))
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }

    bytes.len()
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx).copied() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || byte == b'>' || byte == b'/',
    }
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn is_attribute_name_end(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'=' | b'>' | b'/' | b'"' | b'\'')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    if end > bytes.len() {
        return false;
    }

    bytes[idx..end]
        .iter()
        .zip(pattern.iter())
        .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }

    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}
