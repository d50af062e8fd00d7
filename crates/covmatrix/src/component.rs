//! Component Normalization
//!
//! A component is the unit tracked by the fault-localization matrix: a
//! qualified method (or class) name, lower-cased, with the common library
//! prefixes removed from every qualified name it contains.

use serde::{Deserialize, Serialize};

/// Library package prefixes dropped from qualified names
pub const STRIPPED_PREFIXES: [&str; 3] = ["java.lang.", "java.io.", "java.util."];

/// Level at which trace elements are rendered as components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Qualified method names with argument lists
    #[default]
    Methods,
    /// Enclosing class names
    Files,
}

impl Granularity {
    /// Render a qualified method name at this granularity (not yet normalized)
    #[must_use]
    pub fn render(self, qualified: &str) -> String {
        match self {
            Self::Methods => qualified.to_string(),
            Self::Files => owner_of(strip_arguments(qualified)).to_string(),
        }
    }
}

/// `pkg.Cls.m(int)` → `pkg.Cls.m`
#[must_use]
pub fn strip_arguments(qualified: &str) -> &str {
    qualified.split('(').next().unwrap_or(qualified)
}

/// Drop the last dotted segment: `pkg.Cls.m` → `pkg.Cls`
#[must_use]
pub fn owner_of(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(owner, _)| owner)
}

/// Last dotted segment: `pkg.Cls.m` → `m`
#[must_use]
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Class portion of a method or component name: `pkg.Cls.m(int)` → `Cls`
#[must_use]
pub fn class_portion(name: &str) -> &str {
    simple_name(owner_of(strip_arguments(name)))
}

fn strip_library_prefix(name: &str) -> &str {
    STRIPPED_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

/// Normalize a qualified name into a component.
///
/// The owner name and each argument type lose a leading library prefix, and
/// the result is lower-cased. Applying it twice is a no-op.
#[must_use]
pub fn normalize_component(qualified: &str) -> String {
    let lowered = qualified.to_lowercase();
    match lowered.split_once('(') {
        Some((owner, rest)) => {
            let (args, tail) = rest
                .split_once(')')
                .map_or((rest, None), |(args, tail)| (args, Some(tail)));
            let args: Vec<&str> = args.split(';').map(strip_library_prefix).collect();
            let mut component = format!("{}({}", strip_library_prefix(owner), args.join(";"));
            if let Some(tail) = tail {
                component.push(')');
                component.push_str(tail);
            }
            component
        }
        None => strip_library_prefix(&lowered).to_string(),
    }
}
