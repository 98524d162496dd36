use encoding_rs::Encoding;

const CHARSET_SNIFF_BYTES: usize = 8192;

/// Decodes page bytes: byte-order mark first, then a `<meta charset>` in the
/// first 8 KiB, then UTF-8 with replacement.
pub(crate) fn decode_html(body: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(body) {
        return encoding
            .decode_without_bom_handling(&body[bom_len..])
            .0
            .into_owned();
    }

    let declared = parse_charset_from_html_prefix(body)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    match declared {
        Some(encoding) => encoding.decode(body).0.into_owned(),
        None => String::from_utf8_lossy(body).into_owned(),
    }
}

/// First usable `charset=` label in the page prefix, quoted or bare.
pub(crate) fn parse_charset_from_html_prefix(body: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&body[..body.len().min(CHARSET_SNIFF_BYTES)]);
    let lower = prefix.to_ascii_lowercase();

    lower
        .match_indices("charset=")
        .find_map(|(at, marker)| charset_label(&prefix[at + marker.len()..]))
}

fn charset_label(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    let label = match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let inner = &rest[1..];
            &inner[..inner.find(quote)?]
        }
        _ => {
            let end = rest
                .find(|ch: char| ch.is_whitespace() || matches!(ch, '"' | '\'' | ';' | '>' | '/'))
                .unwrap_or(rest.len());
            &rest[..end]
        }
    };
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_owned())
}
