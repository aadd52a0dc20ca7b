//! Certificate serial number generation.

use crate::error::{CaError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use x509_cert::serial_number::SerialNumber;

/// Exclusive upper bound for generated serials (2^63 - 1).
pub const MAX_SERIAL: u64 = i64::MAX as u64;

/// Draw a random serial number in `[1, MAX_SERIAL)` from the OS entropy source.
///
/// # Panics
///
/// Panics if the operating system cannot supply random bytes.
///
/// # Example
///
/// ```
/// use acme_testca::crypto::serial::{make_serial, MAX_SERIAL};
///
/// let serial = make_serial();
/// assert!(serial > 0 && serial < MAX_SERIAL);
/// ```
pub fn make_serial() -> u64 {
    loop {
        let mut bytes = [0u8; 8];
        if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
            panic!("unable to create random serial number: {}", e);
        }
        // Clearing the top bit gives a uniform draw over [0, 2^63).
        let candidate = u64::from_be_bytes(bytes) & MAX_SERIAL;
        if candidate != 0 && candidate < MAX_SERIAL {
            return candidate;
        }
    }
}

/// Minimal big-endian magnitude bytes of a serial (no leading zero octets).
pub fn serial_magnitude(serial: u64) -> Vec<u8> {
    let bytes = serial.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Encode a serial as a positive DER INTEGER.
pub fn serial_number_from_u64(serial: u64) -> Result<SerialNumber> {
    let mut bytes = serial_magnitude(serial);
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }

    SerialNumber::new(&bytes)
        .map_err(|e| CaError::CertificateError(format!("Failed to create serial number: {}", e)))
}

/// Hex identifier of a parsed serial number.
///
/// Leading zero octets (the DER sign padding) are dropped so the identifier
/// matches the integer value, not its encoding.
pub fn serial_to_id(serial: &SerialNumber) -> String {
    let bytes = serial.as_bytes();
    let first = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    hex::encode(&bytes[first..])
}
