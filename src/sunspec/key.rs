use std::{fmt, fmt::Formatter, str::FromStr};

/// Flattened point key: `W` for a root point, or `module:1:DCW` for a point of a
/// first-level group instance.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum PointKey {
    Point(String),
    Grouped { group: String, index: usize, point: String },
}

#[derive(Debug, thiserror::Error)]
#[error("malformed point key `{0}`")]
pub struct MalformedKey(String);

impl FromStr for PointKey {
    type Err = MalformedKey;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedKey(key.to_string());
        let segments: Vec<&str> = key.split(':').collect();
        match segments.as_slice() {
            [point] if !point.is_empty() => Ok(Self::Point((*point).to_string())),
            [group, index, point] if !group.is_empty() && !point.is_empty() => {
                Ok(Self::Grouped {
                    group: (*group).to_string(),
                    index: index.parse().map_err(|_| malformed())?,
                    point: (*point).to_string(),
                })
            }
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(point) => write!(f, "{point}"),
            Self::Grouped { group, index, point } => write!(f, "{group}:{index}:{point}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ok() -> Result<(), MalformedKey> {
        assert_eq!("W".parse::<PointKey>()?, PointKey::Point("W".to_string()));
        assert_eq!(
            "module:1:DCW".parse::<PointKey>()?,
            PointKey::Grouped { group: "module".to_string(), index: 1, point: "DCW".to_string() },
        );
        Ok(())
    }

    #[test]
    fn display_ok() -> Result<(), MalformedKey> {
        for key in ["W", "module:0:DCWH"] {
            assert_eq!(key.parse::<PointKey>()?.to_string(), key);
        }
        Ok(())
    }

    #[test]
    fn malformed_ok() {
        for key in ["", "module:DCW", "module:x:DCW", "a:0:b:c", ":0:W"] {
            assert!(key.parse::<PointKey>().is_err(), "{key}");
        }
    }
}
