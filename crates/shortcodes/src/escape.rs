//! Backslash escape decoding for quoted argument values.
//!
//! Recognized sequences: `\\`, `\'`, `\"`, `\a`, `\b`, `\f`, `\n`, `\r`, `\t`,
//! `\v`, backslash-newline (line continuation), octal `\o` to `\ooo`, `\xhh`,
//! `\uhhhh` and `\Uhhhhhhhh`. Anything else is left untouched, backslash included.

/// Decode backslash escape sequences in `input`.
///
/// # Example
///
/// ```
/// use shortcodes::decode_escapes;
///
/// assert_eq!(decode_escapes(r#"say \"hi\"\n"#), "say \"hi\"\n");
/// assert_eq!(decode_escapes(r"\u00e9t\xe9"), "été");
/// assert_eq!(decode_escapes(r"C:\path"), r"C:\path");
/// ```
#[must_use]
pub fn decode_escapes(input: &str) -> String {
    if !input.contains('\\') {
        return input.to_owned();
    }

    let mut output = String::with_capacity(input.len());
    let mut remaining = input;

    while let Some(pos) = remaining.find('\\') {
        output.push_str(&remaining[..pos]);
        let after = &remaining[pos + 1..];

        let consumed = match decode_one(after) {
            Some((Some(c), consumed)) => {
                output.push(c);
                consumed
            }
            // Line continuation: backslash and newline both vanish
            Some((None, consumed)) => consumed,
            // Not an escape we understand, keep it verbatim
            None => {
                output.push('\\');
                0
            }
        };

        remaining = &after[consumed..];
    }

    output.push_str(remaining);
    output
}

/// Decode a single escape sequence following a backslash.
///
/// Returns the decoded character (if any) and the number of bytes consumed
/// after the backslash, or `None` when the sequence is not recognized.
fn decode_one(s: &str) -> Option<(Option<char>, usize)> {
    let first = s.chars().next()?;

    let simple = match first {
        '\n' => return Some((None, 1)),
        '\\' | '\'' | '"' => first,
        'a' => '\u{07}',
        'b' => '\u{08}',
        'f' => '\u{0c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{0b}',
        '0'..='7' => return decode_octal(s),
        'x' => return decode_hex(&s[1..], 2),
        'u' => return decode_hex(&s[1..], 4),
        'U' => return decode_hex(&s[1..], 8),
        _ => return None,
    };

    Some((Some(simple), 1))
}

/// Decode one to three octal digits.
fn decode_octal(s: &str) -> Option<(Option<char>, usize)> {
    let len = s
        .bytes()
        .take(3)
        .take_while(|b| (b'0'..=b'7').contains(b))
        .count();
    let value = u32::from_str_radix(&s[..len], 8).ok()?;
    char::from_u32(value).map(|c| (Some(c), len))
}

/// Decode exactly `digits` hex digits; the leading `x`/`u`/`U` counts as consumed.
fn decode_hex(s: &str, digits: usize) -> Option<(Option<char>, usize)> {
    let hex = s.get(..digits)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(value).map(|c| (Some(c), digits + 1))
}
