//! Validated text types shared across the medex crates.
//!
//! Every identifier that reaches storage goes through one of these wrappers first. Disease names
//! and patient ids double as file stems, so they are checked to stay inside their directory.

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// A symptom key contained something other than letters, digits, `_` or `-`
    #[error("invalid symptom key '{0}': use letters, digits, '_' or '-'")]
    InvalidSymptomKey(String),

    /// The value cannot be used as a file stem
    #[error("'{0}' cannot be used as a storage name")]
    UnsafeName(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Canonical identifier for a reportable clinical sign, e.g. `fever` or `sore_throat`.
///
/// Keys are trimmed and lower-cased on construction, so `" Fever "` and `"fever"` are the same key.
/// Any Unicode letter or digit is allowed, as are `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymptomKey(String);

impl SymptomKey {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let key = input.as_ref().trim().to_lowercase();
        if key.is_empty() {
            return Err(TextError::Empty);
        }
        let valid = key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(TextError::InvalidSymptomKey(key));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Longest name accepted as a file stem, in bytes. Leaves room for the extension and the
/// temporary-file suffix within common 255-byte file name limits.
pub const MAX_STORAGE_NAME_BYTES: usize = 200;

/// Rejects names that would escape their storage directory or not fit in a file name.
fn storage_safe(input: impl AsRef<str>) -> Result<String, TextError> {
    let name = input.as_ref().trim();
    if name.is_empty() {
        return Err(TextError::Empty);
    }
    let unsafe_name = name.starts_with('.')
        || name.contains("..")
        || name.contains(['/', '\\', ':'])
        || name.chars().any(char::is_control)
        || name.len() > MAX_STORAGE_NAME_BYTES;
    if unsafe_name {
        return Err(TextError::UnsafeName(name.to_owned()));
    }
    Ok(name.to_owned())
}

/// Unique name of a disease. Case is preserved: `Flu` and `flu` are different diseases.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiseaseName(String);

impl DiseaseName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        storage_safe(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Caller-supplied patient identifier keying one interaction ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        storage_safe(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! text_impls {
    ($($ty:ident),+) => {$(
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = TextError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::new(s)
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ty::new(&s).map_err(serde::de::Error::custom)
            }
        }
    )+};
}

text_impls!(NonEmptyText, SymptomKey, DiseaseName, PatientId);
