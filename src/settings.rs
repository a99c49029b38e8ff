//! Configuration for program evaluation

use serde::{Deserialize, Serialize};

/// Settings shared by all operations of an evaluation.
///
/// TLS material is used by the HTTP clients for mutual TLS against
/// LinkedDataHub-style endpoints. The OpenAI options are passed through to
/// the natural-language front-end and are not consumed by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to a PEM or PKCS#12 bundle containing the client certificate and key
    pub cert_pem_path: Option<String>,
    /// Passphrase for the encrypted private key
    pub cert_password: Option<String>,
    /// Whether to verify the server certificate (disable for dev endpoints)
    pub verify_ssl: bool,
    /// API key for the natural-language front-end
    pub openai_api_key: Option<String>,
    /// Model name for the natural-language front-end
    pub openai_model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            cert_pem_path: None,
            cert_password: None,
            verify_ssl: true,
            openai_api_key: None,
            openai_model: None,
        }
    }

    /// Client certificate settings, if a bundle path was configured.
    pub fn client_identity(&self) -> Option<(&str, Option<&str>)> {
        self.cert_pem_path
            .as_deref()
            .map(|path| (path, self.cert_password.as_deref()))
    }
}
