use regex_lite::Regex;

use crate::model::ParseError;

/// Decides which family a module name belongs to.
///
/// Closure expansion uses the family to tell a module that belongs to a remote
/// module (for example `Firebase-Core` under `Firebase`) from one that belongs to
/// a local family.
pub trait FamilyPolicy {
    /// The family `candidate` belongs to, or `None` when the name carries no
    /// recognizable family.
    fn family<'a>(&self, candidate: &'a str) -> Option<&'a str>;

    /// Whether `candidate` belongs to `family`. Closure expansion asks this for
    /// every name that has a family, so overriding it lets a module join a
    /// family other than the one its name suggests.
    fn is_part_of(&self, candidate: &str, family: &str) -> bool {
        self.family(candidate) == Some(family)
    }
}

impl<P: FamilyPolicy + ?Sized> FamilyPolicy for &P {
    fn family<'a>(&self, candidate: &'a str) -> Option<&'a str> {
        (**self).family(candidate)
    }

    fn is_part_of(&self, candidate: &str, family: &str) -> bool {
        (**self).is_part_of(candidate, family)
    }
}

impl<P: FamilyPolicy + ?Sized> FamilyPolicy for Box<P> {
    fn family<'a>(&self, candidate: &'a str) -> Option<&'a str> {
        (**self).family(candidate)
    }

    fn is_part_of(&self, candidate: &str, family: &str) -> bool {
        (**self).is_part_of(candidate, family)
    }
}

/// The family is the first hyphen-delimited segment of the name, so `Moya` is
/// its own family and `Moya-Core` belongs to `Moya`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HyphenPrefix;

impl FamilyPolicy for HyphenPrefix {
    fn family<'a>(&self, candidate: &'a str) -> Option<&'a str> {
        candidate.split('-').next()
    }
}

/// The family is the `family` capture group of a regular expression. Names the
/// expression does not match have no family.
#[derive(Debug, Clone)]
pub struct PatternPolicy {
    regex: Regex,
}

impl PatternPolicy {
    pub fn new(pattern: &str) -> Result<Self, ParseError> {
        let regex = Regex::new(pattern).map_err(|e| ParseError::InvalidFamilyPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        if !regex.capture_names().any(|name| name == Some("family")) {
            return Err(ParseError::InvalidFamilyPattern {
                pattern: pattern.to_string(),
                reason: "missing a `family` capture group".to_string(),
            });
        }
        Ok(PatternPolicy { regex })
    }
}

impl FamilyPolicy for PatternPolicy {
    fn family<'a>(&self, candidate: &'a str) -> Option<&'a str> {
        self.regex
            .captures(candidate)
            .and_then(|captures| captures.name("family"))
            .map(|family| family.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphen_prefix() {
        assert_eq!(HyphenPrefix.family("Moya"), Some("Moya"));
        assert_eq!(HyphenPrefix.family("Moya-Core"), Some("Moya"));
        assert_eq!(HyphenPrefix.family("Firebase-Core-Resources"), Some("Firebase"));
        assert!(HyphenPrefix.is_part_of("Moya-Core", "Moya"));
        assert!(!HyphenPrefix.is_part_of("Moya-Core", "Core"));
    }

    #[test]
    fn pattern_family() {
        let policy = PatternPolicy::new(r"^(?P<family>[^.]+)\.").unwrap();
        assert_eq!(policy.family("Firebase.Core"), Some("Firebase"));
        assert_eq!(policy.family("Standalone"), None);
        assert!(policy.is_part_of("Firebase.Core", "Firebase"));
    }

    #[test]
    fn pattern_requires_family_group() {
        assert!(matches!(
            PatternPolicy::new(r"^([^.]+)\."),
            Err(ParseError::InvalidFamilyPattern { .. })
        ));
        assert!(PatternPolicy::new(r"(?P<family>[").is_err());
    }

    #[test]
    fn policies_behind_references() {
        let boxed: Box<dyn FamilyPolicy> = Box::new(HyphenPrefix);
        assert_eq!(boxed.family("A-B"), Some("A"));
    }
}
