use std::fmt;
use std::path::PathBuf;

/// A client certificate chain and private key in PEM form.
#[derive(Clone)]
pub struct ClientCredential {
    pub serial_number: String,
    pub pem: Vec<u8>,
    /// File the identity was loaded from.
    pub source: PathBuf,
}

// Key material stays out of logs.
impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredential")
            .field("serial_number", &self.serial_number)
            .field("pem", &format_args!("<{} bytes>", self.pem.len()))
            .field("source", &self.source)
            .finish()
    }
}

/// Canonical form of a certificate serial number: uppercase hex with
/// separators and whitespace removed.
pub fn normalize_serial(serial: &str) -> String {
    serial
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
