//! Keep chat bodies and command arguments on one log line.

/// Characters of a body shown before the preview is cut.
const PREVIEW_CHARS: usize = 300;

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\\' | '"' => {
            out.push('\\');
            out.push(ch);
        }
        c if c.is_control() => out.extend(c.escape_unicode()),
        c => out.push(c),
    }
}

/// Single-line preview of `text`: line breaks, tabs, quotes and other control
/// characters are escaped, and anything past the preview length becomes `…`.
pub fn escape_log(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(PREVIEW_CHARS) + 4);
    let mut chars = text.chars();
    for ch in chars.by_ref().take(PREVIEW_CHARS) {
        push_escaped(&mut out, ch);
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

/// Render a command argument list the way it shows up in the dispatch log: `["a", "b"]`.
pub fn format_args_for_log(args: &[String]) -> String {
    let quoted: Vec<String> = args.iter().map(|a| format!("\"{}\"", escape_log(a))).collect();
    format!("[{}]", quoted.join(", "))
}
