//! String helpers shared by the build and inject paths

use std::path::Path;

use regex::Regex;

/// Derives a scheme slug from a scheme file name.
///
/// The base name is taken, a trailing `.yaml` is stripped, the rest is
/// lowercased and spaces become hyphens.
///
/// # Examples
/// ```
/// use base16_builder::core::utils::slugify;
///
/// assert_eq!(slugify("Solarized Dark.yaml"), "solarized-dark");
/// assert_eq!(slugify("schemes/solarized/solarized-dark.yaml"), "solarized-dark");
/// ```
pub fn slugify(scheme_file: impl AsRef<Path>) -> String {
    let file_name = scheme_file
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.strip_suffix(".yaml").unwrap_or(&file_name);
    stem.to_lowercase().replace(' ', "-")
}

/// Compiles a shell-style selector (`*`, `?`, `[...]`) into an anchored regex.
///
/// Everything else is matched literally. An unterminated `[` is treated as a
/// literal bracket.
pub fn selector_to_regex(selector: &str) -> Result<Regex, regex::Error> {
    let chars: Vec<char> = selector.chars().collect();
    let mut pattern = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '[' => match class_end(&chars, i) {
                Some(close) => {
                    let class: String = chars[i + 1..close].iter().collect();
                    pattern.push('[');
                    let members = match class.strip_prefix('!') {
                        Some(rest) => {
                            pattern.push('^');
                            rest
                        }
                        None => class.as_str(),
                    };
                    for (n, c) in members.chars().enumerate() {
                        match c {
                            '\\' | '[' | ']' | '&' | '~' => pattern.push('\\'),
                            '^' if n == 0 => pattern.push('\\'),
                            _ => {}
                        }
                        pattern.push(c);
                    }
                    pattern.push(']');
                    i = close;
                }
                None => pattern.push_str(r"\["),
            },
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    pattern.push('$');
    Regex::new(&pattern)
}

/// Index of the `]` closing the class opened at `open`.
///
/// A `]` directly after `[` or `[!` is a class member, not the terminator.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut first = open + 1;
    if chars.get(first) == Some(&'!') {
        first += 1;
    }
    if chars.get(first) == Some(&']') {
        first += 1;
    }
    chars
        .get(first..)?
        .iter()
        .position(|&c| c == ']')
        .map(|offset| first + offset)
}
