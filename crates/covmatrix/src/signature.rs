//! VM Method Descriptor Decoding
//!
//! Turns a compact descriptor such as `(I[[Ljava/lang/String;Z)V` into the
//! argument list used inside qualified method names:
//!
//! ```text
//! (I[[Ljava/lang/String;Z)V  ->  int;java.lang.String[][];boolean
//!                             ->  int;String[][];boolean      (short types)
//! ```

use crate::result::{TraceError, TraceResult};

/// Resolve a single-letter primitive code
#[must_use]
pub const fn primitive_name(code: char) -> Option<&'static str> {
    match code {
        'Z' => Some("boolean"),
        'V' => Some("void"),
        'I' => Some("int"),
        'J' => Some("long"),
        'C' => Some("char"),
        'B' => Some("byte"),
        'D' => Some("double"),
        'S' => Some("short"),
        'F' => Some("float"),
        _ => None,
    }
}

/// A decoded method descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    vmsig: String,
    arg_types: Vec<String>,
    return_type: String,
}

impl Signature {
    /// Decode a `(args)return` descriptor.
    ///
    /// With `short_type`, reference types keep only their last path segment.
    pub fn parse(vmsig: &str, short_type: bool) -> TraceResult<Self> {
        let malformed = || TraceError::configuration(format!("malformed method descriptor: {vmsig}"));

        let rest = vmsig.strip_prefix('(').ok_or_else(malformed)?;
        let close = rest.find(')').ok_or_else(malformed)?;
        let (args, ret) = (&rest[..close], &rest[close + 1..]);

        Ok(Self {
            vmsig: vmsig.to_string(),
            arg_types: decode_args(args, short_type, vmsig)?,
            return_type: decode_type(ret, vmsig)?,
        })
    }

    /// Argument types joined with `;`, empty for a no-argument method
    #[must_use]
    pub fn args(&self) -> String {
        self.arg_types.join(";")
    }

    /// Individual argument type names
    #[must_use]
    pub fn arg_types(&self) -> &[String] {
        &self.arg_types
    }

    /// Fully qualified return type name
    #[must_use]
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// The raw descriptor
    #[must_use]
    pub fn vmsig(&self) -> &str {
        &self.vmsig
    }
}

/// Slashes and inner-class separators both become dots
fn dotted(internal: &str) -> String {
    internal.replace(['/', '$'], ".")
}

fn unknown_primitive(code: char, vmsig: &str) -> TraceError {
    TraceError::configuration(format!(
        "unknown primitive type code '{code}' in descriptor {vmsig}"
    ))
}

/// Decode one complete field descriptor (used for the return type)
fn decode_type(descriptor: &str, vmsig: &str) -> TraceResult<String> {
    let dims = descriptor.chars().take_while(|c| *c == '[').count();
    let element = &descriptor[dims..];
    let name = match element.chars().next() {
        Some('L') => {
            let body = element
                .strip_prefix('L')
                .and_then(|e| e.strip_suffix(';'))
                .ok_or_else(|| {
                    TraceError::configuration(format!("unterminated reference type in {vmsig}"))
                })?;
            dotted(body)
        }
        Some(code) => primitive_name(code)
            .ok_or_else(|| unknown_primitive(code, vmsig))?
            .to_string(),
        None => {
            return Err(TraceError::configuration(format!(
                "missing type in descriptor {vmsig}"
            )))
        }
    };
    Ok(name + &"[]".repeat(dims))
}

fn decode_args(descr: &str, short_type: bool, vmsig: &str) -> TraceResult<Vec<String>> {
    let bytes = descr.as_bytes();
    let mut args = Vec::new();
    let mut pos = 0;
    let mut dims = 0;

    while pos < bytes.len() {
        let name = match bytes[pos] {
            b'[' => {
                dims += 1;
                pos += 1;
                continue;
            }
            b'L' => {
                let end = descr[pos..].find(';').map(|i| pos + i).ok_or_else(|| {
                    TraceError::configuration(format!("unterminated reference type in {vmsig}"))
                })?;
                let name = dotted(&descr[pos + 1..end]);
                pos = end + 1;
                name
            }
            _ => {
                let code = descr[pos..].chars().next().unwrap_or_default();
                pos += code.len_utf8();
                primitive_name(code)
                    .ok_or_else(|| unknown_primitive(code, vmsig))?
                    .to_string()
            }
        };

        let name = if short_type {
            name.rsplit('.').next().unwrap_or_default().to_string()
        } else {
            name
        };
        args.push(name + &"[]".repeat(dims));
        dims = 0;
    }

    if dims > 0 {
        return Err(TraceError::configuration(format!(
            "array dimension without element type in descriptor {vmsig}"
        )));
    }
    Ok(args)
}
