use ciborium::value::{Integer, Value as CborValue};
use serde::{Deserialize, Serialize};

use crate::passkey::errors::PasskeyError;
use crate::utils::base64url_decode;

/// Options handed to `navigator.credentials.create()`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
    /// Milliseconds
    pub timeout: u32,
    pub attestation: String,
}

/// Options handed to `navigator.credentials.get()`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String,
    /// Milliseconds
    pub timeout: u32,
    pub rp_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: String,
}

#[derive(Serialize, Debug)]
pub struct RelyingParty {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Debug)]
pub struct UserEntity {
    /// base64url-encoded user handle
    pub id: String,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Serialize, Debug)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: String,
    pub alg: i32,
}

#[derive(Serialize, Debug)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub type_: String,
    /// base64url-encoded credential id
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub resident_key: String,
    pub user_verification: String,
}

/// The browser's response to a creation ceremony.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCredential {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub response: AttestationResponse,
}

#[derive(Deserialize, Debug)]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    #[serde(rename = "attestationObject")]
    pub attestation_object: String,
    /// Transport hints from `getTransports()`, optional and informational
    #[serde(default)]
    pub transports: Vec<String>,
}

/// The browser's response to an assertion ceremony.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorResponse {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub response: AssertionResponse,
}

#[derive(Deserialize, Debug)]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: String,
    pub signature: String,
    #[serde(rename = "userHandle")]
    pub user_handle: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ClientData {
    challenge: String,
    origin: String,
    #[serde(rename = "type")]
    type_: String,
}

/// Decoded clientDataJSON plus the exact bytes it was parsed from; the
/// raw bytes feed the signature check.
#[derive(Debug)]
pub(super) struct ParsedClientData {
    pub(super) challenge: String,
    pub(super) origin: String,
    pub(super) type_: String,
    pub(super) raw_data: Vec<u8>,
}

impl ParsedClientData {
    pub(super) fn from_base64(client_data_json: &str) -> Result<Self, PasskeyError> {
        let raw_data = base64url_decode(client_data_json)
            .map_err(|e| PasskeyError::Format(format!("Failed to decode client data: {e}")))?;

        let data_str = std::str::from_utf8(&raw_data)
            .map_err(|e| PasskeyError::Format(format!("Client data is not valid UTF-8: {e}")))?;

        let data: ClientData = serde_json::from_str(data_str)
            .map_err(|e| PasskeyError::Format(format!("Failed to parse client data JSON: {e}")))?;

        Ok(Self {
            challenge: data.challenge,
            origin: data.origin,
            type_: data.type_,
            raw_data,
        })
    }
}

/// Flags for AuthenticatorData as defined in WebAuthn Level 3
mod auth_data_flags {
    /// User Present (UP) - Bit 0
    pub(super) const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub(super) const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 3
    pub(super) const BE: u8 = 1 << 3;
    /// Backup State (BS) - Bit 4
    pub(super) const BS: u8 = 1 << 4;
    /// Attested Credential Data Present (AT) - Bit 6
    pub(super) const AT: u8 = 1 << 6;
}

/// Parsed authenticator data.
///
/// Layout (minimum 37 bytes): RP ID hash (32), flags (1), counter (4),
/// then optional attested credential data and extensions.
#[derive(Debug)]
pub(super) struct AuthenticatorData {
    pub(super) rp_id_hash: Vec<u8>,
    pub(super) flags: u8,
    pub(super) sign_count: u32,
    pub(super) raw_data: Vec<u8>,
}

impl AuthenticatorData {
    pub(super) fn from_bytes(data: Vec<u8>) -> Result<Self, PasskeyError> {
        if data.len() < 37 {
            return Err(PasskeyError::Format(
                "Authenticator data too short".to_string(),
            ));
        }

        Ok(Self {
            rp_id_hash: data[..32].to_vec(),
            flags: data[32],
            sign_count: u32::from_be_bytes([data[33], data[34], data[35], data[36]]),
            raw_data: data,
        })
    }

    pub(super) fn from_base64(auth_data: &str) -> Result<Self, PasskeyError> {
        let data = base64url_decode(auth_data).map_err(|e| {
            PasskeyError::Format(format!("Failed to decode authenticator data: {e}"))
        })?;
        Self::from_bytes(data)
    }

    pub(super) fn is_user_present(&self) -> bool {
        (self.flags & auth_data_flags::UP) != 0
    }

    pub(super) fn is_user_verified(&self) -> bool {
        (self.flags & auth_data_flags::UV) != 0
    }

    pub(super) fn is_backup_eligible(&self) -> bool {
        (self.flags & auth_data_flags::BE) != 0
    }

    pub(super) fn is_backed_up(&self) -> bool {
        (self.flags & auth_data_flags::BS) != 0
    }

    pub(super) fn has_attested_credential_data(&self) -> bool {
        (self.flags & auth_data_flags::AT) != 0
    }

    /// Parse the attested credential data section: AAGUID (16),
    /// credential id length (2, big-endian), credential id, COSE key.
    /// Only meaningful when the AT flag is set.
    pub(super) fn attested_credential(&self) -> Result<AttestedCredential, PasskeyError> {
        if !self.has_attested_credential_data() {
            return Err(PasskeyError::MissingCredentialData);
        }

        let data = &self.raw_data;
        let mut pos = 37;

        if data.len() < pos + 18 {
            return Err(PasskeyError::Format(
                "Authenticator data too short for attested credential".to_string(),
            ));
        }

        let aaguid = data[pos..pos + 16].to_vec();
        pos += 16;

        let cred_id_len = ((data[pos] as usize) << 8) | (data[pos + 1] as usize);
        pos += 2;

        if cred_id_len == 0 || cred_id_len > 1023 {
            return Err(PasskeyError::Format(
                "Invalid credential id length".to_string(),
            ));
        }
        if data.len() < pos + cred_id_len {
            return Err(PasskeyError::Format(
                "Authenticator data too short for credential id".to_string(),
            ));
        }

        let credential_id = data[pos..pos + cred_id_len].to_vec();
        pos += cred_id_len;

        let public_key = extract_ec2_public_key(&data[pos..])?;

        Ok(AttestedCredential {
            aaguid,
            credential_id,
            public_key,
        })
    }
}

/// Credential material carried inside a registration response.
#[derive(Debug)]
pub(super) struct AttestedCredential {
    pub(super) aaguid: Vec<u8>,
    pub(super) credential_id: Vec<u8>,
    /// Uncompressed P-256 point: 0x04 || x || y
    pub(super) public_key: Vec<u8>,
}

/// Pull the x/y coordinates out of a COSE EC2 key and assemble the
/// uncompressed point `ring` verifies against.
fn extract_ec2_public_key(cose_key: &[u8]) -> Result<Vec<u8>, PasskeyError> {
    let key: CborValue = ciborium::de::from_reader(cose_key)
        .map_err(|e| PasskeyError::Format(format!("Invalid public key CBOR: {e}")))?;

    let CborValue::Map(map) = key else {
        return Err(PasskeyError::Format("Invalid public key format".to_string()));
    };

    let mut x_coord = None;
    let mut y_coord = None;

    for (key, value) in map {
        if let CborValue::Integer(i) = key {
            if i == Integer::from(-2) {
                if let CborValue::Bytes(x) = value {
                    x_coord = Some(x);
                }
            } else if i == Integer::from(-3) {
                if let CborValue::Bytes(y) = value {
                    y_coord = Some(y);
                }
            }
        }
    }

    match (x_coord, y_coord) {
        (Some(x), Some(y)) => {
            let mut public_key = Vec::with_capacity(1 + x.len() + y.len());
            public_key.push(0x04);
            public_key.extend_from_slice(&x);
            public_key.extend_from_slice(&y);
            Ok(public_key)
        }
        _ => Err(PasskeyError::Format(
            "Missing or invalid key coordinates".to_string(),
        )),
    }
}

/// Decoded attestation object. The attestation statement itself is not
/// verified: the relying party requests "none" attestation, so only the
/// format tag and the authenticator data matter.
#[derive(Debug)]
pub(super) struct AttestationObject {
    pub(super) fmt: String,
    pub(super) auth_data: Vec<u8>,
}

impl AttestationObject {
    pub(super) fn from_base64(attestation_base64: &str) -> Result<Self, PasskeyError> {
        let attestation_bytes = base64url_decode(attestation_base64).map_err(|e| {
            PasskeyError::Format(format!("Failed to decode attestation object: {e}"))
        })?;

        let attestation_cbor: CborValue = ciborium::de::from_reader(&attestation_bytes[..])
            .map_err(|e| PasskeyError::Format(format!("Invalid CBOR data: {e}")))?;

        let CborValue::Map(map) = attestation_cbor else {
            return Err(PasskeyError::Format(
                "Invalid attestation format".to_string(),
            ));
        };

        let mut fmt = None;
        let mut auth_data = None;

        for (key, value) in map {
            if let CborValue::Text(k) = key {
                match k.as_str() {
                    "fmt" => {
                        if let CborValue::Text(f) = value {
                            fmt = Some(f);
                        }
                    }
                    "authData" => {
                        if let CborValue::Bytes(data) = value {
                            auth_data = Some(data);
                        }
                    }
                    _ => {}
                }
            }
        }

        match (fmt, auth_data) {
            (Some(fmt), Some(auth_data)) => Ok(AttestationObject { fmt, auth_data }),
            _ => Err(PasskeyError::Format(
                "Missing required attestation data".to_string(),
            )),
        }
    }
}
