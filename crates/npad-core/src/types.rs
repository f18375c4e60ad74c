use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{NpadError, NpadResult};

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

/// Retention tier chosen by the writer of a paste.
///
/// Each tier binds a maximum plaintext size to a maximum lifetime: the larger
/// the allowance, the shorter the paste lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetentionClass {
    /// 20 minutes, up to 10 MiB
    Short,
    /// 8 hours, up to 8 MiB
    Day,
    /// 14 days, up to 2 MiB
    Fortnight,
    /// Never expires, up to 200 KiB
    Permanent,
}

impl RetentionClass {
    pub const ALL: [RetentionClass; 4] = [
        RetentionClass::Short,
        RetentionClass::Day,
        RetentionClass::Fortnight,
        RetentionClass::Permanent,
    ];

    /// Maximum plaintext size in bytes.
    pub const fn max_bytes(self) -> usize {
        match self {
            RetentionClass::Short => 10 * MIB,
            RetentionClass::Day => 8 * MIB,
            RetentionClass::Fortnight => 2 * MIB,
            RetentionClass::Permanent => 200 * KIB,
        }
    }

    /// Lifetime of a paste, or `None` if it never expires.
    pub fn ttl(self) -> Option<Duration> {
        match self {
            RetentionClass::Short => Some(Duration::from_secs(20 * 60)),
            RetentionClass::Day => Some(Duration::from_secs(8 * 60 * 60)),
            RetentionClass::Fortnight => Some(Duration::from_secs(14 * 24 * 60 * 60)),
            RetentionClass::Permanent => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            RetentionClass::Short => 0,
            RetentionClass::Day => 1,
            RetentionClass::Fortnight => 2,
            RetentionClass::Permanent => 3,
        }
    }

    /// Reject `size` if it exceeds this class's cap.
    pub fn check_size(self, size: usize) -> NpadResult<()> {
        let limit = self.max_bytes();
        if size > limit {
            return Err(NpadError::InputTooLarge {
                class: self,
                size,
                limit,
            });
        }
        Ok(())
    }
}

impl TryFrom<u8> for RetentionClass {
    type Error = NpadError;

    fn try_from(value: u8) -> NpadResult<Self> {
        match value {
            0 => Ok(RetentionClass::Short),
            1 => Ok(RetentionClass::Day),
            2 => Ok(RetentionClass::Fortnight),
            3 => Ok(RetentionClass::Permanent),
            other => Err(NpadError::InvalidRetentionClass(other)),
        }
    }
}

impl fmt::Display for RetentionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RetentionClass::Short => "20min|10MB",
            RetentionClass::Day => "8h|8MB",
            RetentionClass::Fortnight => "14days|2MB",
            RetentionClass::Permanent => "never|200KB",
        };
        f.write_str(label)
    }
}
