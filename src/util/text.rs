use std::borrow::Cow;

/// Makes feed-supplied text safe to print as a single terminal line.
///
/// Titles, publisher labels and links come straight from upstream XML, so
/// they may carry ANSI escape sequences or stray control bytes. This removes:
/// - CSI sequences (`ESC [` ... final byte 0x40-0x7E)
/// - OSC sequences (`ESC ]` ... BEL or `ESC \`)
/// - bare ESC, DEL and other C0 controls
///
/// Line breaks and tabs become single spaces so a row never spans lines.
/// Clean input is returned borrowed.
pub fn sanitize_line(s: &str) -> Cow<'_, str> {
    if !s.chars().any(needs_rewrite) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\t' | '\n' | '\r' => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}

fn needs_rewrite(c: char) -> bool {
    c.is_control()
}
