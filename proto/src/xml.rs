//! Scanners for the line-at-a-time XML dialect spoken over GUI RPC.
//!
//! These are not an XML parser. Each helper inspects one line; callers loop
//! over a [`LineStream`] and dispatch on the first helper that matches.
//! Tag names are passed bare (`"name"`), except for [`match_tag`] which
//! takes the literal delimiter (`"</project>"`).

use crate::error::{Result, RpcError};
use crate::miofile::LineStream;

/// True when `line` contains the literal `tag`.
pub fn match_tag(line: &str, tag: &str) -> bool {
    line.contains(tag)
}

/// Raw text following `<tag>` up to the next `<` (or end of line).
fn element_text<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let start = line.find(&open)? + open.len();
    let rest = &line[start..];
    let end = rest.find('<').unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Extract `<tag>value</tag>` into `out`, trimmed and unescaped.
pub fn parse_str(line: &str, tag: &str, out: &mut String) -> bool {
    match element_text(line, tag) {
        Some(text) => {
            *out = xml_unescape(text.trim());
            true
        }
        None => false,
    }
}

/// Extract an integer. Malformed digits read as 0, like `atoi`.
pub fn parse_int(line: &str, tag: &str, out: &mut i32) -> bool {
    match element_text(line, tag) {
        Some(text) => {
            *out = atoi(text);
            true
        }
        None => false,
    }
}

/// Extract a float. Malformed text reads as 0.0, like `strtod`.
pub fn parse_double(line: &str, tag: &str, out: &mut f64) -> bool {
    match element_text(line, tag) {
        Some(text) => {
            *out = atof(text);
            true
        }
        None => false,
    }
}

/// Extract a flag: `<tag/>` is true, `<tag>N</tag>` is `N != 0`.
pub fn parse_bool(line: &str, tag: &str, out: &mut bool) -> bool {
    if line.contains(&format!("<{}/>", tag)) {
        *out = true;
        return true;
    }
    match element_text(line, tag) {
        Some(text) => {
            *out = atoi(text) != 0;
            true
        }
        None => false,
    }
}

fn atoi(text: &str) -> i32 {
    let s = text.trim_start();
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut n: i64 = 0;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        n = (n * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let n = if neg { -n } else { n };
    n.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn atof(text: &str) -> f64 {
    let s = text.trim();
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(s.len());
    let mut candidate = &s[..end];
    while !candidate.is_empty() {
        if let Ok(v) = candidate.parse::<f64>() {
            return v;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

fn tag_name(end_tag: &str) -> String {
    end_tag
        .trim_start_matches("</")
        .trim_end_matches('>')
        .to_string()
}

/// Append every line up to `end_tag` to `out`, plus whatever precedes
/// `end_tag` on its own line.
pub fn copy_element_contents(
    input: &mut dyn LineStream,
    end_tag: &str,
    out: &mut String,
) -> Result<()> {
    while let Some(line) = input.next_line() {
        if let Some(idx) = line.find(end_tag) {
            out.push_str(&line[..idx]);
            return Ok(());
        }
        out.push_str(&line);
    }
    Err(RpcError::XmlParse(tag_name(end_tag)))
}

/// Like [`copy_element_contents`] but refuses to grow past `max_len` bytes.
pub fn copy_element_contents_bounded(
    input: &mut dyn LineStream,
    end_tag: &str,
    max_len: usize,
) -> Result<String> {
    let mut out = String::new();
    while let Some(line) = input.next_line() {
        let (chunk, done) = match line.find(end_tag) {
            Some(idx) => (&line[..idx], true),
            None => (line.as_str(), false),
        };
        if out.len() + chunk.len() > max_len {
            return Err(RpcError::BufferOverflow(tag_name(end_tag)));
        }
        out.push_str(chunk);
        if done {
            return Ok(out);
        }
    }
    Err(RpcError::XmlParse(tag_name(end_tag)))
}

/// Remove a `<![CDATA[ ... ]]>` wrapper if present.
pub fn strip_cdata(text: &str) -> &str {
    let t = text.trim();
    match t.strip_prefix("<![CDATA[") {
        Some(inner) => inner.strip_suffix("]]>").unwrap_or(inner),
        None => t,
    }
}

pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn xml_unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix('#')
                .and_then(|n| n.parse::<u32>().ok())
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
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
