// Number formatting for summaries.

/// `1234567` -> `"1,234,567"`.
pub fn commify(v: i64) -> String {
    let digits = v.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if v < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Binary-prefixed size with three decimals, e.g. `"1.500 kB"`.
pub fn human_readable(v: u64, unit: &str) -> String {
    const PREFIXES: [&str; 7] = ["", "k", "M", "G", "T", "P", "E"];
    let mut value = v as f64;
    let mut divs = 0usize;
    while value >= 1024.0 && divs + 1 < PREFIXES.len() {
        value /= 1024.0;
        divs += 1;
    }
    format!("{:.3} {}{}", value, PREFIXES[divs], unit)
}

/// Shorten `s` to at most `max_width` chars by replacing its middle with
/// `...`.
pub fn collapse_middle(s: &str, max_width: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let keep = max_width - 3;
    let head = keep / 2;
    let tail = keep - head;
    let mut out: String = chars[..head].iter().collect();
    out.push_str("...");
    out.extend(&chars[chars.len() - tail..]);
    out
}
