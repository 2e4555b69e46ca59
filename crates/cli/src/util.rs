use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Truncate a string to fit within `width` display columns, ending with
/// `tail` when something was cut. An empty `tail` cuts silently.
pub fn truncate_display(s: &str, width: usize, tail: &str) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    let budget = width.saturating_sub(display_width(tail));
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = char_width(ch);
        if used + cw > budget {
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }
    format!("{}{}", &s[..end_byte], tail)
}

/// Cut `s` to `width` display columns, skipping over ANSI escape sequences
/// (they take no room) and keeping every sequence after the cut so colors
/// are still switched off. Returns the cut string and its display width.
pub fn cut_str_in_width(s: &str, width: usize) -> (String, usize) {
    let mut used = 0;
    let mut escape = false;
    for (i, ch) in s.char_indices() {
        if escape {
            escape = !ch.is_ascii_alphabetic();
            continue;
        }
        if ch == '\x1B' {
            escape = true;
            continue;
        }
        let cw = char_width(ch);
        if used + cw > width {
            let mut result = s[..i].to_string();
            for ch in s[i..].chars() {
                if escape {
                    result.push(ch);
                    escape = !ch.is_ascii_alphabetic();
                } else if ch == '\x1B' {
                    result.push(ch);
                    escape = true;
                }
            }
            return (result, used);
        }
        used += cw;
    }
    (s.to_string(), used)
}

/// Replace characters that would move the terminal cursor with their
/// Unicode control pictures.
pub fn control_pictures(s: &str) -> String {
    if !s.contains(['\r', '\x1B', '\n', '\t']) {
        return s.to_string();
    }
    s.chars()
        .map(|ch| match ch {
            '\r' => '\u{240D}',
            '\x1B' => '\u{241B}',
            '\n' => '\u{240A}',
            '\t' => '\u{2409}',
            other => other,
        })
        .collect()
}
