#[derive(Debug)]
pub enum DecodeError {
    InvalidBase64(base64::DecodeError),
    InvalidLength,
    InvalidTypeCode(u8),
    InvalidUtf8,
    InvalidFormat,
    Other(anyhow::Error),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidBase64(e) => write!(f, "Invalid Base64: {}", e),
            DecodeError::InvalidLength => write!(f, "Invalid Length"),
            DecodeError::InvalidTypeCode(code) => write!(f, "Invalid tuple type code: 0x{:02x}", code),
            DecodeError::InvalidUtf8 => write!(f, "Invalid UTF-8"),
            DecodeError::InvalidFormat => write!(f, "Invalid Format"),
            DecodeError::Other(e) => write!(f, "Other: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<base64::DecodeError> for DecodeError {
    fn from(e: base64::DecodeError) -> Self { DecodeError::InvalidBase64(e) }
}

impl From<bincode::Error> for DecodeError {
    fn from(e: bincode::Error) -> Self { DecodeError::Other(anyhow::Error::new(e)) }
}
