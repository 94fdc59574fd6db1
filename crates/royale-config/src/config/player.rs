use std::fmt;

use serde::Serialize;

/// `major.minor.revision` of the targeted player runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PlayerVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
}

impl PlayerVersion {
    /// Oldest runtime the compiler can target.
    pub const MINIMUM: PlayerVersion = PlayerVersion::new(10, 1, 0);

    pub const fn new(major: u32, minor: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            revision,
        }
    }

    /// Accepts one to three dot-separated numbers; missing parts are zero.
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.trim().split('.').collect();
        if parts.len() > 3 {
            return None;
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().ok()?;
        }
        Some(Self::new(numbers[0], numbers[1], numbers[2]))
    }

    /// Lowest SWF format version this runtime requires.
    /// Saturates at `u32::MAX` for absurd major or minor numbers.
    pub fn minimum_swf_version(&self) -> u32 {
        let (major, minor) = (self.major, self.minor);
        match major {
            m if m < 10 => 9,
            10 if minor <= 1 => 10,
            10 => minor.saturating_add(9),
            11 => minor.saturating_add(13),
            _ => major.saturating_add(11),
        }
    }
}

impl Default for PlayerVersion {
    fn default() -> Self {
        Self::new(11, 1, 0)
    }
}

impl fmt::Display for PlayerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        assert_eq!(PlayerVersion::parse("11.1"), Some(PlayerVersion::new(11, 1, 0)));
        assert_eq!(PlayerVersion::parse("32"), Some(PlayerVersion::new(32, 0, 0)));
        assert_eq!(PlayerVersion::parse("10.2.153"), Some(PlayerVersion::new(10, 2, 153)));
        assert_eq!(PlayerVersion::parse("1.2.3.4"), None);
        assert_eq!(PlayerVersion::parse("eleven"), None);
        assert_eq!(PlayerVersion::parse(""), None);
    }

    #[test]
    fn test_minimum_ordering() {
        assert!(PlayerVersion::new(10, 0, 0) < PlayerVersion::MINIMUM);
        assert!(PlayerVersion::new(10, 1, 0) >= PlayerVersion::MINIMUM);
    }

    #[test]
    fn test_minimum_swf_version() {
        assert_eq!(PlayerVersion::new(10, 1, 0).minimum_swf_version(), 10);
        assert_eq!(PlayerVersion::new(10, 3, 0).minimum_swf_version(), 12);
        assert_eq!(PlayerVersion::new(11, 1, 0).minimum_swf_version(), 14);
        assert_eq!(PlayerVersion::new(32, 0, 0).minimum_swf_version(), 43);
        assert_eq!(PlayerVersion::new(11, u32::MAX, 0).minimum_swf_version(), u32::MAX);
        assert_eq!(PlayerVersion::new(u32::MAX, 0, 0).minimum_swf_version(), u32::MAX);
    }
}
