use crate::error::MetaStoreError;
use std::fmt;
use std::str::FromStr;

/// Local document identifier: a dense, reusable index into the meta store.
pub type Lid = u32;

/// The LID that means "no mapping".
///
/// Never assigned to a document.
pub const NO_LID: Lid = 0;

/// A global document identifier.
///
/// Twelve opaque bytes, immutable once assigned to a document. Ordering and
/// hashing are bytewise. Displayed as 24 lower-case hex digits.
///
/// 全局文档标识符：12 个不透明字节，一旦分配给文档就不可变。
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GlobalId([u8; GlobalId::LENGTH]);

impl GlobalId {
    /// Number of bytes in a `GlobalId`.
    pub const LENGTH: usize = 12;

    #[inline]
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Bucket hash used to shard the GID index.
    #[inline]
    pub(crate) fn bucket_hash(&self) -> u32 {
        self.0
            .iter()
            .fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(*b)).wrapping_mul(0x0100_0193))
    }
}

impl From<[u8; GlobalId::LENGTH]> for GlobalId {
    fn from(bytes: [u8; GlobalId::LENGTH]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for GlobalId {
    type Error = MetaStoreError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::LENGTH] =
            bytes
                .try_into()
                .map_err(|_| MetaStoreError::InvalidGlobalId {
                    input: format!("{} bytes", bytes.len()),
                })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalId({self})")
    }
}

impl FromStr for GlobalId {
    type Err = MetaStoreError;

    /// Parses 24 hex digits, optionally prefixed with `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MetaStoreError::InvalidGlobalId {
            input: s.to_owned(),
        };
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != Self::LENGTH * 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0u8; Self::LENGTH];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}
