use std::fmt;
use std::str::FromStr;

/// Step ceiling for [`crate::Simulator::run`], so looping programs still terminate.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Which assembler leniencies become hard errors.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Strictness {
    /// Lines whose mnemonic or operands cannot be resolved, duplicate and malformed labels.
    pub unresolved: bool,
    /// Malformed numbers and references to undefined labels.
    pub literals: bool,
}

impl Strictness {
    pub fn all() -> Self {
        Strictness {
            unresolved: true,
            literals: true,
        }
    }
}

impl FromStr for Strictness {
    type Err = String;
    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let mut strictness = Self::default();
        for word in string.split(',') {
            let value = match word.trim() {
                "" => continue,
                "all" => return Ok(Self::all()),
                "unresolved" => &mut strictness.unresolved,
                "literals" => &mut strictness.literals,
                _ => return Err(format!("Unknown strictness '{}'", word)),
            };
            if *value {
                return Err(format!("Cannot specify strictness '{}' twice", word));
            }
            *value = true;
        }
        Ok(strictness)
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = [("unresolved", self.unresolved), ("literals", self.literals)];
        let mut has_any = false;
        for (name, value) in words {
            if !value {
                continue;
            }
            if has_any {
                write!(f, ",")?;
            }
            write!(f, "{}", name)?;
            has_any = true;
        }
        Ok(())
    }
}

/// Per-session configuration of a [`crate::Simulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub strictness: Strictness,
    pub max_steps: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            strictness: Strictness::default(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_word_lists() {
        assert_eq!("".parse(), Ok(Strictness::default()));
        assert_eq!(
            "literals".parse(),
            Ok(Strictness {
                unresolved: false,
                literals: true
            })
        );
        assert_eq!("unresolved,literals".parse(), Ok(Strictness::all()));
        assert_eq!("all".parse(), Ok(Strictness::all()));
    }

    #[test]
    fn rejects_unknown_and_repeated() {
        assert_eq!(
            "labels".parse::<Strictness>(),
            Err("Unknown strictness 'labels'".to_string())
        );
        assert_eq!(
            "literals,literals".parse::<Strictness>(),
            Err("Cannot specify strictness 'literals' twice".to_string())
        );
    }

    #[test]
    fn displays_round_trip() {
        assert_eq!(Strictness::all().to_string(), "unresolved,literals");
        assert_eq!(Strictness::default().to_string(), "");
    }
}
