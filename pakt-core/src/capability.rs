// pakt-core/src/capability.rs

//! Command-line package arguments: `[KIND:]NAME[.ARCH][OP<VERSION>]`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

lazy_static! {
    static ref CAPABILITY_RE: Regex =
        Regex::new(r"^([^\s<>=]+?)\s*(?:(<=|>=|<|>|=)\s*([^\s<>=]+))?$").unwrap();
}

/// Architectures recognized as a `.ARCH` suffix.
const KNOWN_ARCHES: &[&str] = &[
    "noarch", "x86_64", "i386", "i486", "i586", "i686", "aarch64", "armv7hl", "ppc64le", "s390x",
    "riscv64", "src", "nosrc",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResKind {
    #[default]
    Package,
    Patch,
    Pattern,
    Product,
    #[serde(rename = "srcpackage")]
    SrcPackage,
}

impl ResKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResKind::Package => "package",
            ResKind::Patch => "patch",
            ResKind::Pattern => "pattern",
            ResKind::Product => "product",
            ResKind::SrcPackage => "srcpackage",
        }
    }
}

impl fmt::Display for ResKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "package" | "pkg" => Ok(ResKind::Package),
            "patch" => Ok(ResKind::Patch),
            "pattern" => Ok(ResKind::Pattern),
            "product" => Ok(ResKind::Product),
            "srcpackage" | "source" => Ok(ResKind::SrcPackage),
            other => Err(format!("Unknown resolvable type '{}'.", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl VersionOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(VersionOp::Lt),
            "<=" => Some(VersionOp::Le),
            "=" => Some(VersionOp::Eq),
            ">=" => Some(VersionOp::Ge),
            ">" => Some(VersionOp::Gt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VersionOp::Lt => "<",
            VersionOp::Le => "<=",
            VersionOp::Eq => "=",
            VersionOp::Ge => ">=",
            VersionOp::Gt => ">",
        }
    }

    /// Whether `ordering` (candidate compared to the requested version) satisfies the operator.
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            VersionOp::Lt => ordering == Ordering::Less,
            VersionOp::Le => ordering != Ordering::Greater,
            VersionOp::Eq => ordering == Ordering::Equal,
            VersionOp::Ge => ordering != Ordering::Less,
            VersionOp::Gt => ordering == Ordering::Greater,
        }
    }
}

/// `NAME[.ARCH][OP<VERSION>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: String,
    pub arch: Option<String>,
    pub constraint: Option<(VersionOp, String)>,
}

impl Capability {
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let text = text.trim();
        let caps = CAPABILITY_RE
            .captures(text)
            .ok_or_else(|| EngineError::Parse(format!("Invalid capability '{}'.", text)))?;

        let full = &caps[1];
        let (name, arch) = match full.rsplit_once('.') {
            Some((base, suffix)) if !base.is_empty() && KNOWN_ARCHES.contains(&suffix) => {
                (base.to_string(), Some(suffix.to_string()))
            }
            _ => (full.to_string(), None),
        };

        let constraint = match (caps.get(2), caps.get(3)) {
            (Some(op), Some(version)) => {
                // the regex only lets the five operators through
                let op = VersionOp::parse(op.as_str())
                    .ok_or_else(|| EngineError::Parse(format!("Invalid operator in '{}'.", text)))?;
                Some((op, version.as_str().to_string()))
            }
            _ => None,
        };

        Ok(Capability {
            name,
            arch,
            constraint,
        })
    }

    pub fn has_glob(&self) -> bool {
        self.name.contains('*')
    }

    /// Matches `candidate` against the name, `*` matching any run of characters.
    pub fn name_matches(&self, candidate: &str) -> bool {
        glob_match(&self.name, candidate)
    }

    pub fn arch_matches(&self, arch: &str) -> bool {
        self.arch.as_deref().map_or(true, |a| a == arch)
    }

    pub fn version_matches(&self, version: &str) -> bool {
        match &self.constraint {
            Some((op, wanted)) => op.accepts(vercmp(version, wanted)),
            None => true,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(arch) = &self.arch {
            write!(f, ".{}", arch)?;
        }
        if let Some((op, version)) = &self.constraint {
            write!(f, " {} {}", op.as_str(), version)?;
        }
        Ok(())
    }
}

/// One positional argument of install/remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArg {
    pub raw: String,
    pub kind: ResKind,
    pub capability: Capability,
}

impl PackageArg {
    /// Parses `raw`; a `kind:` prefix overrides `default_kind`.
    pub fn parse(raw: &str, default_kind: ResKind) -> Result<Self, EngineError> {
        let (kind, rest) = match raw.split_once(':') {
            Some((prefix, rest)) => match prefix.parse::<ResKind>() {
                Ok(kind) => (kind, rest),
                Err(_) => (default_kind, raw),
            },
            None => (default_kind, raw),
        };
        Ok(PackageArg {
            raw: raw.to_string(),
            kind,
            capability: Capability::parse(rest)?,
        })
    }

    pub fn parse_all(args: &[String], default_kind: ResKind) -> Result<Vec<PackageArg>, EngineError> {
        args.iter().map(|a| PackageArg::parse(a, default_kind)).collect()
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // no '*' at all
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

/// Compares two version strings segment by segment, numeric runs numerically.
///
/// Numeric segments sort after alphabetic ones; a version with extra
/// segments is newer than its prefix.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let sa = segments(a);
    let sb = segments(b);
    for (x, y) in sa.iter().zip(sb.iter()) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(nx), Ok(ny)) => nx.cmp(&ny),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    sa.len().cmp(&sb.len())
}

fn segments(version: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut numeric = false;
    for (i, c) in version.char_indices() {
        if !c.is_ascii_alphanumeric() {
            if let Some(s) = start.take() {
                out.push(&version[s..i]);
            }
            continue;
        }
        match start {
            Some(s) if c.is_ascii_digit() != numeric => {
                out.push(&version[s..i]);
                start = Some(i);
                numeric = c.is_ascii_digit();
            }
            Some(_) => {}
            None => {
                start = Some(i);
                numeric = c.is_ascii_digit();
            }
        }
    }
    if let Some(s) = start {
        out.push(&version[s..]);
    }
    out
}
