//! Scheme loading and color fact expansion.
//!
//! A scheme file is a flat YAML mapping with `scheme`, `author` and the sixteen
//! base colors `base00`..`base0F`. [`expand`] turns a validated [`Scheme`] into
//! the [`FactTable`] that templates are rendered against.
//!
//! For every base color the table carries the hex value, its three hex
//! components, the byte-swapped (`bgr`) hex value, the integer RGB components
//! and the components as fractions of 255:
//!
//! ```text
//! base0D-hex      268bd2      base0D-rgb-r   38      base0D-dec-r   0.14901960784313725
//! base0D-hex-r    26          base0D-rgb-g   139     base0D-dec-g   0.5450980392156862
//! base0D-hex-g    8b          base0D-rgb-b   210     base0D-dec-b   0.8235294117647058
//! base0D-hex-b    d2
//! base0D-hex-bgr  d28b26
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::utils::slugify;

/// Number of base colors in a scheme
pub const BASE_COLOR_COUNT: usize = 16;

/// Number of facts derived from a single base color
pub const FACTS_PER_COLOR: usize = 11;

/// Returns the key of a base color, e.g. `base0A` for index 10.
pub fn base_key(index: usize) -> String {
    format!("base{index:02X}")
}

/// A validated sixteen color scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheme {
    /// Human readable scheme name
    pub name: String,
    /// Scheme author
    pub author: String,
    /// Slug derived from the scheme's file name
    pub slug: String,
    /// `base00`..`base0F`, six hex digits each
    pub colors: [String; BASE_COLOR_COUNT],
    /// File the scheme was loaded from
    pub path: PathBuf,
}

impl Scheme {
    /// Load and validate a scheme file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if the file is absent and
    /// [`Error::MalformedPalette`] if it is not a YAML mapping or any required
    /// key is missing or malformed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        debug!(path = %path.display(), "Loaded scheme file");
        Self::from_yaml_str(&content, path)
    }

    /// Parse and validate scheme YAML that was read from `path`.
    pub fn from_yaml_str(content: &str, path: &Path) -> Result<Self> {
        let mut raw: RawScheme = serde_yaml::from_str(content)
            .map_err(|e| Error::malformed(path, format!("invalid YAML: {e}")))?;

        let name = raw
            .scheme
            .take()
            .ok_or_else(|| Error::malformed(path, "missing key \"scheme\""))?;
        let author = raw
            .author
            .take()
            .ok_or_else(|| Error::malformed(path, "missing key \"author\""))?;

        let mut colors: [String; BASE_COLOR_COUNT] = Default::default();
        for (index, (slot, value)) in colors.iter_mut().zip(raw.colors()).enumerate() {
            let key = base_key(index);
            let value = value
                .map(|v| v.trim().to_string())
                .ok_or_else(|| Error::malformed(path, format!("missing key \"{key}\"")))?;
            if !is_hex_color(&value) {
                return Err(Error::malformed(
                    path,
                    format!("\"{key}\" must be six hex digits, got \"{value}\""),
                ));
            }
            *slot = value;
        }

        Ok(Self {
            name,
            author,
            slug: slugify(path),
            colors,
            path: path.to_path_buf(),
        })
    }
}

/// Scheme file as written. Plain scalars are kept as their source text, so
/// unquoted colors such as `000000` or `000e00` survive unchanged.
#[derive(Debug, Deserialize)]
struct RawScheme {
    scheme: Option<String>,
    author: Option<String>,
    base00: Option<String>,
    base01: Option<String>,
    base02: Option<String>,
    base03: Option<String>,
    base04: Option<String>,
    base05: Option<String>,
    base06: Option<String>,
    base07: Option<String>,
    base08: Option<String>,
    base09: Option<String>,
    #[serde(rename = "base0A")]
    base0a: Option<String>,
    #[serde(rename = "base0B")]
    base0b: Option<String>,
    #[serde(rename = "base0C")]
    base0c: Option<String>,
    #[serde(rename = "base0D")]
    base0d: Option<String>,
    #[serde(rename = "base0E")]
    base0e: Option<String>,
    #[serde(rename = "base0F")]
    base0f: Option<String>,
}

impl RawScheme {
    /// Base colors in index order
    fn colors(&mut self) -> [Option<String>; BASE_COLOR_COUNT] {
        [
            self.base00.take(),
            self.base01.take(),
            self.base02.take(),
            self.base03.take(),
            self.base04.take(),
            self.base05.take(),
            self.base06.take(),
            self.base07.take(),
            self.base08.take(),
            self.base09.take(),
            self.base0a.take(),
            self.base0b.take(),
            self.base0c.take(),
            self.base0d.take(),
            self.base0e.take(),
            self.base0f.take(),
        ]
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Reverses the order of the two-character groups of a hex string.
///
/// Returns `None` for strings that do not split evenly into pairs or are not
/// ASCII.
///
/// ```
/// use base16_builder::core::scheme::swap_byte_pairs;
///
/// assert_eq!(swap_byte_pairs("aabbcc").as_deref(), Some("ccbbaa"));
/// assert_eq!(swap_byte_pairs("abc"), None);
/// ```
pub fn swap_byte_pairs(hex: &str) -> Option<String> {
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return None;
    }
    let pairs: Vec<&str> = (0..hex.len())
        .step_by(2)
        .map(|start| &hex[start..start + 2])
        .collect();
    Some(pairs.into_iter().rev().collect())
}

/// Flat fact name to value mapping consumed by templates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FactTable(BTreeMap<String, String>);

impl FactTable {
    /// Look up a fact by name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of facts in the table
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over facts in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Expand a scheme into its fact table.
///
/// Expansion is pure: the same scheme always yields the same table. Colors are
/// validated when the [`Scheme`] is built, so the only way this can fail is a
/// scheme constructed by hand with malformed colors.
pub fn expand(scheme: &Scheme) -> Result<FactTable> {
    let mut facts = BTreeMap::new();
    facts.insert("scheme-name".to_string(), scheme.name.clone());
    facts.insert("scheme-author".to_string(), scheme.author.clone());
    facts.insert("scheme-slug".to_string(), scheme.slug.clone());

    for (index, hex) in scheme.colors.iter().enumerate() {
        let base = base_key(index);
        if !is_hex_color(hex) {
            return Err(Error::malformed(
                &scheme.path,
                format!("\"{base}\" must be six hex digits, got \"{hex}\""),
            ));
        }
        let bgr = swap_byte_pairs(hex).ok_or_else(|| {
            Error::malformed(&scheme.path, format!("\"{base}\" cannot be byte swapped"))
        })?;

        facts.insert(format!("{base}-hex"), hex.clone());
        facts.insert(format!("{base}-hex-bgr"), bgr);

        for (channel, start) in [("r", 0), ("g", 2), ("b", 4)] {
            let component = &hex[start..start + 2];
            let value = u8::from_str_radix(component, 16).map_err(|e| {
                Error::malformed(&scheme.path, format!("\"{base}\" component {channel}: {e}"))
            })?;

            facts.insert(format!("{base}-hex-{channel}"), component.to_string());
            facts.insert(format!("{base}-rgb-{channel}"), value.to_string());
            facts.insert(format!("{base}-dec-{channel}"), decimal_fraction(value));
        }
    }

    Ok(FactTable(facts))
}

/// `value / 255` in shortest round-trip form, always with a fractional part.
fn decimal_fraction(value: u8) -> String {
    format!("{:?}", f64::from(value) / 255.0)
}
