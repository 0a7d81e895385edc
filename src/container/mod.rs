use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// The exact length of a full [`ContainerID`].
pub const CONTAINER_ID_LEN: usize = 64;

/// A validated, full-length Docker container identifier.
///
/// Docker names each container's per-subsystem cgroup directory after the
/// container's full identifier: 64 ASCII hexadecimal characters.
///
/// # Examples
///
/// ```
/// # use dockmon::container::{ContainerID, Error};
/// let raw_id = "4823f1a2b0c94823f1a2b0c94823f1a2b0c94823f1a2b0c94823f1a2b0c94823";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_str(), raw_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is not exactly
    /// [`CONTAINER_ID_LEN`] ASCII hexadecimal characters.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dockmon::container::{ContainerID, Error};
    /// let truncated = "abc123";
    /// assert!(ContainerID::new(truncated).is_err());
    /// ```
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.len() != CONTAINER_ID_LEN || !src.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for ContainerID {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ID: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_valid_id_accepted() {
        let id = ContainerID::new(VALID_ID).expect("64 hex chars should be valid");
        assert_eq!(id.as_str(), VALID_ID);
        assert_eq!(id.to_string(), VALID_ID);
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let raw = VALID_ID.to_uppercase();
        assert!(ContainerID::new(&raw).is_ok());
    }

    #[test]
    fn test_too_short_rejected() {
        let raw = &VALID_ID[..CONTAINER_ID_LEN - 1];
        assert!(matches!(
            ContainerID::new(raw),
            Err(Error::InvalidContainerID(_))
        ));
    }

    #[test]
    fn test_too_long_rejected() {
        let raw = format!("{VALID_ID}0");
        assert!(ContainerID::new(raw).is_err());
    }

    #[test]
    fn test_non_hex_rejected() {
        let raw = VALID_ID.replace('0', "g");
        assert!(ContainerID::new(raw).is_err());
    }

    #[test]
    fn test_from_str_roundtrip() {
        let id: ContainerID = VALID_ID.parse().unwrap();
        assert_eq!(id.as_ref(), VALID_ID);
    }

    #[test]
    fn test_map_lookup_by_str() {
        let mut tracked = std::collections::HashMap::new();
        tracked.insert(ContainerID::new(VALID_ID).unwrap(), 1u32);
        // Borrow<str> lets map keys be queried with a plain &str.
        assert_eq!(tracked.get(VALID_ID), Some(&1));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ContainerID::new(VALID_ID).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{VALID_ID}\""));
    }
}
