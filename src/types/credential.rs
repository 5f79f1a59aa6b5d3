use serde::{Deserialize, Serialize};

/// Storage form of a sealed secret. Both fields are base64; the ciphertext
/// carries the GCM tag at its end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SealedSecret {
    pub nonce: String,
    pub ciphertext: String,
}
