//! Injection marker lines and template references.
//!
//! A recipient file marks the region to rewrite with two lines:
//!
//! ```text
//! # %%base16_template: i3##colors-only%%
//! ...replaced on every injection...
//! # %%base16_template_end%%
//! ```
//!
//! Anything may precede the markers on their lines (usually a comment leader),
//! nothing may follow them.

use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::{Error, Result};
use crate::core::templates::DEFAULT_TEMPLATE;

static START_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*%%base16_template:([^%]+)%%$").expect("start marker regex is valid")
});

static END_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*%%base16_template_end%%$").expect("end marker regex is valid")
});

/// Separator between group and sub-template in a reference
const REF_SEPARATOR: &str = "##";

/// Reference carried by a start marker, with the trailing `\r` of CRLF files ignored
fn start_reference(line: &str) -> Option<&str> {
    START_MARKER
        .captures(line.strip_suffix('\r').unwrap_or(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|reference| !reference.is_empty())
}

fn is_end_marker(line: &str) -> bool {
    END_MARKER.is_match(line.strip_suffix('\r').unwrap_or(line))
}

/// Position of the first valid marker pair in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    /// Trimmed reference text, e.g. `i3##colors-only`
    pub reference: String,
    /// Zero-based index of the start marker line
    pub start_line: usize,
    /// Zero-based index of the end marker line
    pub end_line: usize,
}

/// Find the first start marker followed by an end marker.
///
/// End markers seen before any start marker are ignored. Content after the
/// first complete pair is not examined.
pub fn find_marker_pair(content: &str) -> Option<MarkerPair> {
    let mut start: Option<(usize, &str)> = None;

    for (index, line) in content.split('\n').enumerate() {
        match start {
            None => {
                if let Some(reference) = start_reference(line) {
                    start = Some((index, reference));
                }
            }
            Some((start_line, reference)) => {
                if is_end_marker(line) {
                    return Some(MarkerPair {
                        reference: reference.to_string(),
                        start_line,
                        end_line: index,
                    });
                }
            }
        }
    }

    None
}

/// Return the template reference of the first marker pair in `content`.
///
/// # Errors
///
/// [`Error::NoMarker`] naming `path` when there is no start marker followed
/// by an end marker.
pub fn locate(content: &str, path: &Path) -> Result<TemplateRef> {
    find_marker_pair(content)
        .map(|pair| TemplateRef::parse(&pair.reference))
        .ok_or_else(|| Error::NoMarker(path.to_path_buf()))
}

/// Replace the lines strictly between the first marker pair with `rendered`.
///
/// Marker lines stay where they are. The rendered text contributes its own
/// lines, so the region may grow or shrink. One trailing newline of the
/// rendered text is dropped; every other byte, `\r` included, is kept.
pub fn splice(content: &str, rendered: &str, path: &Path) -> Result<String> {
    let pair = find_marker_pair(content).ok_or_else(|| Error::NoMarker(path.to_path_buf()))?;
    let lines: Vec<&str> = content.split('\n').collect();

    let rendered = rendered.strip_suffix('\n').unwrap_or(rendered);
    let rendered_lines: Vec<&str> = if rendered.is_empty() {
        Vec::new()
    } else {
        rendered.split('\n').collect()
    };

    let spliced: Vec<&str> = lines[..=pair.start_line]
        .iter()
        .copied()
        .chain(rendered_lines)
        .chain(lines[pair.end_line..].iter().copied())
        .collect();

    Ok(spliced.join("\n"))
}

/// A `(template group, sub-template)` pair named by a start marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub group: String,
    pub template: String,
}

impl TemplateRef {
    /// Parse `group##template`, or a bare `group` meaning its `default` template.
    pub fn parse(reference: &str) -> Self {
        match reference.split_once(REF_SEPARATOR) {
            Some((group, template)) => Self {
                group: group.to_string(),
                template: template.to_string(),
            },
            None => Self {
                group: reference.trim_matches('#').to_string(),
                template: DEFAULT_TEMPLATE.to_string(),
            },
        }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.group, REF_SEPARATOR, self.template)
    }
}
