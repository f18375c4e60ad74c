//! Capability tokens
//!
//! Token format:
//! ```text
//! <X|N><unix-seconds>@<secret>[@<name>]
//! ```
//! - `X<secs>`: expires at `secs`; `N<secs>`: never expires, `secs` is the
//!   creation time.
//! - `<secret>`: unpadded base64url of the 48-byte digest. Storage keys carry
//!   only its first 16 characters. Without encryption the token is the storage
//!   key; with encryption it carries all 64 characters, which are required to
//!   derive the key and nonce.
//! - `<name>`: optional label, at most 32 bytes.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use npad_core::clock::{unix_nanos, unix_secs};
use npad_core::{NpadError, NpadResult, RetentionClass};
use npad_crypto::{seal, Digest, FILENAME_SECRET_LEN};

use crate::settings::StoreSettings;

/// Longest accepted paste name in bytes. Longer names are truncated.
pub const MAX_NAME_LEN: usize = 32;

const FIELD_SEPARATOR: char = '@';

/// Leading field of every token and storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    /// `X<secs>`: removed once `secs` has passed
    Expiring(i64),
    /// `N<secs>`: kept forever, `secs` records the creation time
    Permanent(i64),
}

impl Prefix {
    /// The prefix a paste of `class` created at `now` receives.
    pub fn for_class(class: RetentionClass, now: SystemTime) -> Self {
        let created = unix_secs(now);
        match class.ttl() {
            Some(ttl) => Prefix::Expiring(created.saturating_add(ttl.as_secs() as i64)),
            None => Prefix::Permanent(created),
        }
    }

    pub fn expires_at(&self) -> Option<i64> {
        match self {
            Prefix::Expiring(secs) => Some(*secs),
            Prefix::Permanent(_) => None,
        }
    }

    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.expires_at().is_some_and(|at| at <= now_unix)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Expiring(secs) => write!(f, "X{secs}"),
            Prefix::Permanent(secs) => write!(f, "N{secs}"),
        }
    }
}

impl FromStr for Prefix {
    type Err = NpadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (expiring, digits) = if let Some(digits) = s.strip_prefix('X') {
            (true, digits)
        } else if let Some(digits) = s.strip_prefix('N') {
            (false, digits)
        } else {
            return Err(NpadError::InvalidToken(format!("unknown prefix marker [{s}]")));
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NpadError::InvalidToken(format!("malformed prefix [{s}]")));
        }
        let secs: i64 = digits
            .parse()
            .map_err(|_| NpadError::InvalidToken(format!("prefix out of range [{s}]")))?;
        Ok(if expiring {
            Prefix::Expiring(secs)
        } else {
            Prefix::Permanent(secs)
        })
    }
}

/// Output of [`build_token`]: what the caller gets and what the backend stores.
#[derive(Debug, Clone)]
pub struct SealedPaste {
    pub token: String,
    pub storage_key: String,
    /// Compressed and, if configured, sealed payload
    pub payload: Vec<u8>,
}

/// A syntactically valid token, split into its parts.
#[derive(Debug)]
pub struct ParsedToken {
    pub storage_key: String,
    pub prefix: Prefix,
    /// Full digest; present only when encryption is configured
    pub secret: Option<Digest>,
}

impl ParsedToken {
    /// The prefix field exactly as written in the token.
    pub fn prefix_field(&self) -> &str {
        self.storage_key
            .split_once(FIELD_SEPARATOR)
            .map_or(self.storage_key.as_str(), |(prefix, _)| prefix)
    }
}

/// Truncate `name` to [`MAX_NAME_LEN`] bytes and check it is usable as part
/// of a filename. An empty name means "no name".
pub fn normalize_name(name: &str) -> NpadResult<Option<String>> {
    if name.is_empty() {
        return Ok(None);
    }
    let mut end = name.len().min(MAX_NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let name = &name[..end];
    check_name(name).map_err(NpadError::InvalidName)?;
    Ok(Some(name.to_string()))
}

fn check_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty name".into());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("name longer than {MAX_NAME_LEN} bytes"));
    }
    if name.starts_with('.') {
        return Err(format!("name may not start with '.' [{name}]"));
    }
    if name
        .chars()
        .any(|c| c == FIELD_SEPARATOR || c == '/' || c == '\\' || c.is_control())
    {
        return Err(format!("name contains a forbidden character [{}]", name.escape_default()));
    }
    Ok(())
}

fn join_key(prefix: &str, secret: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{prefix}{FIELD_SEPARATOR}{secret}{FIELD_SEPARATOR}{name}"),
        None => format!("{prefix}{FIELD_SEPARATOR}{secret}"),
    }
}

/// Turn a plaintext into its token, storage key and stored payload.
///
/// Size and name are checked before any hashing. Nothing is written.
pub fn build_token(
    settings: &StoreSettings,
    plaintext: &[u8],
    class: RetentionClass,
    name: &str,
    now: SystemTime,
) -> NpadResult<SealedPaste> {
    class.check_size(plaintext.len())?;
    let name = normalize_name(name)?;

    let prefix = Prefix::for_class(class, now).to_string();
    let payload = settings.compressor.compress(plaintext)?;
    let digest = Digest::derive(&payload, unix_nanos(now));
    let storage_key = join_key(&prefix, &digest.filename_secret(), name.as_deref());

    match settings.cipher {
        None => Ok(SealedPaste {
            token: storage_key.clone(),
            storage_key,
            payload,
        }),
        Some(cipher) => {
            let km = digest.key_material(&prefix);
            let sealed = seal(cipher, km.key(), km.nonce(), &payload)?;
            Ok(SealedPaste {
                token: join_key(&prefix, &digest.encode(), name.as_deref()),
                storage_key,
                payload: sealed,
            })
        }
    }
}

/// Split `token` and recover its storage key and, with encryption, its digest.
pub fn parse_token(settings: &StoreSettings, token: &str) -> NpadResult<ParsedToken> {
    let fields: Vec<&str> = token.split(FIELD_SEPARATOR).collect();
    let (prefix_field, secret_field, name) = match fields.as_slice() {
        [prefix, secret] => (*prefix, *secret, None),
        [prefix, secret, name] => (*prefix, *secret, Some(*name)),
        _ => {
            return Err(NpadError::InvalidToken(format!(
                "expected 2 or 3 fields, found {}",
                fields.len()
            )))
        }
    };

    let prefix: Prefix = prefix_field.parse()?;

    if secret_field.len() < FILENAME_SECRET_LEN {
        return Err(NpadError::InvalidToken(format!(
            "secret shorter than {FILENAME_SECRET_LEN} characters"
        )));
    }
    if !secret_field
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(NpadError::InvalidToken(
            "secret contains non-base64url characters".into(),
        ));
    }

    if let Some(name) = name {
        check_name(name).map_err(NpadError::InvalidToken)?;
    }

    let secret = match settings.cipher {
        Some(_) => Some(Digest::decode(secret_field)?),
        None => None,
    };

    Ok(ParsedToken {
        storage_key: join_key(prefix_field, &secret_field[..FILENAME_SECRET_LEN], name),
        prefix,
        secret,
    })
}

/// True iff `key` (a token or a storage key) carries an `X` prefix whose
/// time is at or before `now_unix`.
///
/// Keys that do not parse are never considered expired, so the collector
/// leaves foreign files alone.
pub fn is_expired(key: &str, now_unix: i64) -> bool {
    let prefix = key.split(FIELD_SEPARATOR).next().unwrap_or(key);
    match prefix.parse::<Prefix>() {
        Ok(prefix) => prefix.is_expired(now_unix),
        Err(_) => false,
    }
}
