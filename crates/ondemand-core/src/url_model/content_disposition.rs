//! `Content-Disposition` filename extraction.

/// Filename hinted by a `Content-Disposition` header value.
///
/// `filename*=UTF-8''<percent-encoded>` wins over `filename=`; the latter may
/// be quoted (with `\"` escapes, `;` allowed inside the quotes) or a bare token.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for (name, value) in params(header_value) {
        if name.eq_ignore_ascii_case("filename*") {
            if let Some(decoded) = decode_ext_value(&value).filter(|s| !s.is_empty()) {
                return Some(decoded);
            }
        } else if name.eq_ignore_ascii_case("filename") && plain.is_none() && !value.is_empty() {
            plain = Some(value);
        }
    }

    plain
}

/// Splits `type; k=v; k="v;v"` into unquoted `(k, v)` pairs, skipping the disposition type.
fn params(header_value: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut chars = header_value.chars().peekable();

    // Skip disposition type ("attachment" / "inline").
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            chars.next();
            if c == '=' {
                break;
            }
            if c == ';' {
                name.clear();
                continue;
            }
            name.push(c);
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            return out;
        }

        while chars.peek().map_or(false, |c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
            }
        } else {
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
                value.push(c);
            }
            value = value.trim().to_string();
        }
        out.push((name, value));
    }
}

/// RFC 5987 `charset'lang'pct-encoded`; only UTF-8 (any case) and ISO-8859-1 are understood.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _lang = parts.next()?;
    let encoded = parts.next()?;
    let bytes = percent_decode(encoded);
    if charset.eq_ignore_ascii_case("utf-8") {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}

fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
