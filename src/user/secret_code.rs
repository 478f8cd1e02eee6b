use anyhow::{Context, Result};
use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

/// How many fresh codes a store tries before giving up on a registration.
pub const MAX_SECRET_CODE_ATTEMPTS: usize = 16;

pub trait SecretCodeGenerator: Send + Sync {
    fn generate(&self) -> Result<String>;
}

/// `<unix timestamp>-<one random byte, uppercase hex>`.
///
/// Only 256 distinct codes per second, so callers must check for
/// collisions against the codes already issued.
#[derive(Default)]
pub struct TimestampRandomByteGenerator;

impl SecretCodeGenerator for TimestampRandomByteGenerator {
    fn generate(&self) -> Result<String> {
        let random_byte: u8 = rand::random();
        Ok(format_secret_code(
            unix_timestamp()?,
            format!("{:02X}", random_byte),
        ))
    }
}

pub fn format_secret_code<S: Display>(timestamp: u64, suffix: S) -> String {
    format!("{}-{}", timestamp, suffix)
}

pub fn unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the unix epoch")?
        .as_secs())
}
