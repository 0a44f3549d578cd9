use base64::{engine::general_purpose, Engine as _};

use crate::error::DecodeError;

const RESUME_TAG: u8 = 0x01;
const END_TAG: u8 = 0x00;

/// Opaque resume position of a cursor.
///
/// `Start` resumes from the beginning, `Resume` carries operator-specific
/// state, and `End` marks an exhausted cursor and must never be resumed.
/// Continuations compare only by byte identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Continuation {
    #[default]
    Start,
    Resume(Vec<u8>),
    End,
}

impl Continuation {
    pub fn resume(bytes: Vec<u8>) -> Self { Continuation::Resume(bytes) }

    pub fn is_start(&self) -> bool { matches!(self, Continuation::Start) }

    pub fn is_end(&self) -> bool { matches!(self, Continuation::End) }

    /// Operator-specific payload, if any
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Continuation::Resume(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Continuation::Start => Vec::new(),
            Continuation::End => vec![END_TAG],
            Continuation::Resume(payload) => {
                let mut out = Vec::with_capacity(payload.len() + 1);
                out.push(RESUME_TAG);
                out.extend_from_slice(payload);
                out
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        match bytes.split_first() {
            None => Ok(Continuation::Start),
            Some((&END_TAG, rest)) if rest.is_empty() => Ok(Continuation::End),
            Some((&RESUME_TAG, rest)) => Ok(Continuation::Resume(rest.to_vec())),
            Some(_) => Err(DecodeError::InvalidFormat),
        }
    }

    /// `None` (no token supplied) is equivalent to `Start`
    pub fn from_optional_bytes(bytes: Option<&[u8]>) -> Result<Self, DecodeError> {
        match bytes {
            None => Ok(Continuation::Start),
            Some(bytes) => Self::from_bytes(bytes),
        }
    }

    pub fn to_base64(&self) -> String { general_purpose::URL_SAFE_NO_PAD.encode(self.to_bytes()) }

    pub fn from_base64<T: AsRef<[u8]>>(input: T) -> Result<Self, DecodeError> {
        let decoded = general_purpose::URL_SAFE_NO_PAD.decode(input).map_err(DecodeError::InvalidBase64)?;
        Self::from_bytes(&decoded)
    }
}

impl std::fmt::Display for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Continuation::Start => write!(f, "Start"),
            Continuation::End => write!(f, "End"),
            Continuation::Resume(_) => write!(f, "Resume({})", self.to_base64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinguished_tokens() {
        assert_eq!(Continuation::from_bytes(&Continuation::Start.to_bytes()).unwrap(), Continuation::Start);
        assert_eq!(Continuation::from_bytes(&Continuation::End.to_bytes()).unwrap(), Continuation::End);
        assert_ne!(Continuation::Start.to_bytes(), Continuation::End.to_bytes());
        // an empty payload is still a resumable position
        assert_eq!(Continuation::from_bytes(&Continuation::Resume(vec![]).to_bytes()).unwrap(), Continuation::Resume(vec![]));
    }

    #[test]
    fn test_base64_token() {
        let token = Continuation::Resume(vec![0, 1, 2, 0xFF]);
        assert_eq!(Continuation::from_base64(token.to_base64()).unwrap(), token);
        assert!(Continuation::from_base64("!!").is_err());
        assert!(matches!(Continuation::from_bytes(&[0x07]), Err(DecodeError::InvalidFormat)));
    }
}
