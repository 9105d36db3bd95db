//! Adds the request nonce to inline and external `<script>` tags of an HTML
//! page, so they run under a policy whose `script-src` carries the same nonce.

use crate::nonce::Nonce;

const SCRIPT_OPEN: &str = "<script";
const SCRIPT_CLOSE: &str = "</script";

fn is_html_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

/// Index of the `>` closing the tag that starts before `from`, ignoring
/// `>` inside quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

/// Whether the lowercased attribute text of a tag declares `nonce`.
fn has_nonce_attr(attrs: &str) -> bool {
    let bytes = attrs.as_bytes();
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None => {
                let at_name_start = i == 0 || is_html_space(bytes[i - 1]);
                if at_name_start && attrs[i..].starts_with("nonce") {
                    let after = bytes.get(i + "nonce".len()).copied();
                    if after.is_none_or(|a| a == b'=' || a == b'/' || is_html_space(a)) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

fn starts_with_at(bytes: &[u8], at: usize, prefix: &[u8]) -> bool {
    bytes.get(at..at + prefix.len()) == Some(prefix)
}

/// Adds `nonce` to every `<script>` start tag in `html`.
///
/// Only real start tags are touched. Comments, quoted attribute values of
/// other tags and the raw text of a script element are copied as they are.
pub fn inject_script_nonce(html: &str, nonce: &Nonce) -> String {
    // ASCII lowercasing keeps byte offsets, so indices found in `lower`
    // are valid in `html`.
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut out = String::with_capacity(html.len() + 64);
    let mut copied = 0;
    let mut pos = 0;

    while let Some(found) = lower[pos..].find('<') {
        let start = pos + found;

        if starts_with_at(bytes, start, b"<!--") {
            pos = lower[start + 4..]
                .find("-->")
                .map_or(bytes.len(), |end| start + 4 + end + 3);
            continue;
        }

        let name_end = start + SCRIPT_OPEN.len();
        let is_script = starts_with_at(bytes, start, SCRIPT_OPEN.as_bytes())
            && bytes
                .get(name_end)
                .is_some_and(|&b| b == b'>' || b == b'/' || is_html_space(b));

        if is_script {
            let tag_end = find_tag_end(bytes, name_end).unwrap_or(bytes.len());
            out.push_str(&html[copied..name_end]);
            copied = name_end;
            if !has_nonce_attr(&lower[name_end..tag_end]) {
                out.push_str(" nonce=\"");
                out.push_str(nonce.as_str());
                out.push('"');
            }
            // script content is raw text up to the end tag
            let body = (tag_end + 1).min(bytes.len());
            pos = lower[body..]
                .find(SCRIPT_CLOSE)
                .map_or(bytes.len(), |end| body + end + SCRIPT_CLOSE.len());
            continue;
        }

        let opens_tag = bytes
            .get(start + 1)
            .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'/' || b == b'!' || b == b'?');
        pos = if opens_tag {
            find_tag_end(bytes, start + 1).map_or(bytes.len(), |end| end + 1)
        } else {
            start + 1
        };
    }

    out.push_str(&html[copied..]);
    out
}
