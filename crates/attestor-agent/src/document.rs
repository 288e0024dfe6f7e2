use serde::{Deserialize, Serialize};

/// A verification method entry of a DID Document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    pub public_key_base58: String,
}

/// Resolved DID Document (the subset the issuer inspects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    pub verification_method: Vec<VerificationMethod>,
    pub authentication: Vec<String>,
}

impl DidDocument {
    /// Document with a single Ed25519 verification key.
    pub fn with_ed25519_key(did: &str, public_key_base58: String) -> Self {
        let key_id = format!("{}#verkey", did);
        Self {
            context: vec![
                "https://www.w3.org/ns/did/v1".into(),
                "https://w3id.org/security/suites/ed25519-2018/v1".into(),
            ],
            id: did.to_string(),
            verification_method: vec![VerificationMethod {
                id: key_id.clone(),
                method_type: "Ed25519VerificationKey2018".into(),
                controller: did.to_string(),
                public_key_base58,
            }],
            authentication: vec![key_id],
        }
    }
}
