use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::foundation::error::{StagemixError, StagemixResult};

/// A parsed operator command selecting a composite and the sources for the
/// A and B channels. `None` slots are wildcards, filled from the current
/// state by the controller.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CompositeCommand {
    pub composite: Option<String>,
    pub a: Option<String>,
    pub b: Option<String>,
}

static RE_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([|+-]?\w[-_\w]*|\*)\s*\(\s*([-_\w*]+)\s*,\s*([-_\w*]+)\s*\)\s*$").unwrap()
});
static RE_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([|+-]?\w[-_\w]*|\*)\s*\(\s*([-_\w*]+)\s*\)\s*$").unwrap());
static RE_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([|+-]?\w[-_\w]*|\*)\s*$").unwrap());

fn slot(s: &str) -> Option<String> {
    if s == "*" { None } else { Some(s.to_string()) }
}

impl CompositeCommand {
    pub fn new(
        composite: Option<String>,
        a: Option<String>,
        b: Option<String>,
    ) -> Self {
        Self { composite, a, b }
    }
}

impl FromStr for CompositeCommand {
    type Err = StagemixError;

    fn from_str(s: &str) -> StagemixResult<Self> {
        if let Some(c) = RE_FULL.captures(s) {
            return Ok(Self::new(slot(&c[1]), slot(&c[2]), slot(&c[3])));
        }
        if let Some(c) = RE_SINGLE.captures(s) {
            return Ok(Self::new(slot(&c[1]), slot(&c[2]), None));
        }
        if let Some(c) = RE_BARE.captures(s) {
            return Ok(Self::new(slot(&c[1]), None, None));
        }
        Err(StagemixError::lookup(format!(
            "bad composite command '{s}' (must be 'composite(A,B)', 'composite(A)' or 'composite')"
        )))
    }
}

impl fmt::Display for CompositeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn star(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("*")
        }
        write!(
            f,
            "{}({},{})",
            star(&self.composite),
            star(&self.a),
            star(&self.b)
        )
    }
}

/// Wildcard-aware comparison: slots match when equal or when either side is
/// a wildcard.
impl PartialEq for CompositeCommand {
    fn eq(&self, other: &Self) -> bool {
        fn slot_eq(a: &Option<String>, b: &Option<String>) -> bool {
            match (a, b) {
                (Some(x), Some(y)) => x == y,
                _ => true,
            }
        }
        slot_eq(&self.composite, &other.composite)
            && slot_eq(&self.a, &other.a)
            && slot_eq(&self.b, &other.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_forms() {
        let full: CompositeCommand = "sbs(cam1,cam2)".parse().unwrap();
        assert_eq!(full.composite.as_deref(), Some("sbs"));
        assert_eq!(full.a.as_deref(), Some("cam1"));
        assert_eq!(full.b.as_deref(), Some("cam2"));

        let single: CompositeCommand = "fs(cam1)".parse().unwrap();
        assert_eq!(single.composite.as_deref(), Some("fs"));
        assert_eq!(single.a.as_deref(), Some("cam1"));
        assert_eq!(single.b, None);

        let bare: CompositeCommand = "fs".parse().unwrap();
        assert_eq!(bare.composite.as_deref(), Some("fs"));
        assert_eq!(bare.a, None);
    }

    #[test]
    fn wildcards_parse_to_none() {
        let cmd: CompositeCommand = "*(cam1,*)".parse().unwrap();
        assert_eq!(cmd.composite, None);
        assert_eq!(cmd.a.as_deref(), Some("cam1"));
        assert_eq!(cmd.b, None);
    }

    #[test]
    fn accepts_swapped_spelling_and_prefixes() {
        assert!("^sbs(cam1,cam2)".parse::<CompositeCommand>().is_err());
        // the caret is not part of the command grammar, but blinder prefixes are
        assert!("|fs(cam1)".parse::<CompositeCommand>().is_ok());
        assert!("-fs".parse::<CompositeCommand>().is_ok());
    }

    #[test]
    fn display_roundtrips() {
        let cmd: CompositeCommand = "sbs(cam1,cam2)".parse().unwrap();
        assert_eq!(cmd.to_string(), "sbs(cam1,cam2)");
        let wild: CompositeCommand = "fs".parse().unwrap();
        assert_eq!(wild.to_string(), "fs(*,*)");
        let again: CompositeCommand = wild.to_string().parse().unwrap();
        assert_eq!(again.composite.as_deref(), Some("fs"));
    }

    #[test]
    fn equality_treats_wildcards_as_match() {
        let a: CompositeCommand = "sbs(cam1,cam2)".parse().unwrap();
        let b: CompositeCommand = "sbs(*,*)".parse().unwrap();
        let c: CompositeCommand = "fs(cam1,cam2)".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("(((".parse::<CompositeCommand>().is_err());
    }
}
