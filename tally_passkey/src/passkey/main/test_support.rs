//! Builders for synthetic WebAuthn payloads, shared by the ceremony tests.
//! They produce the same byte layouts a real authenticator emits, signed
//! with a throwaway P-256 key.

use ciborium::value::{Integer, Value as CborValue};
use ring::digest;
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};

use crate::utils::base64url_encode;

pub(crate) fn base64url(data: &[u8]) -> String {
    base64url_encode(data)
}

pub(crate) fn make_client_data(type_: &str, challenge: &str, origin: &str) -> String {
    let json = serde_json::json!({
        "type": type_,
        "challenge": challenge,
        "origin": origin,
        "crossOrigin": false,
    });
    base64url(json.to_string().as_bytes())
}

pub(crate) fn cose_ec2_key(x: &[u8], y: &[u8]) -> Vec<u8> {
    let map = CborValue::Map(vec![
        (
            CborValue::Integer(Integer::from(1)),
            CborValue::Integer(Integer::from(2)),
        ),
        (
            CborValue::Integer(Integer::from(3)),
            CborValue::Integer(Integer::from(-7)),
        ),
        (
            CborValue::Integer(Integer::from(-1)),
            CborValue::Integer(Integer::from(1)),
        ),
        (
            CborValue::Integer(Integer::from(-2)),
            CborValue::Bytes(x.to_vec()),
        ),
        (
            CborValue::Integer(Integer::from(-3)),
            CborValue::Bytes(y.to_vec()),
        ),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&map, &mut out).unwrap();
    out
}

/// Raw authenticator data: RP ID hash, flags, counter, and optionally an
/// attested credential section (aaguid, credential id, COSE key).
pub(crate) fn make_auth_data(
    rp_id: &str,
    flags: u8,
    sign_count: u32,
    attested: Option<([u8; 16], Vec<u8>, Vec<u8>)>,
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(digest::digest(&digest::SHA256, rp_id.as_bytes()).as_ref());
    data.push(flags);
    data.extend_from_slice(&sign_count.to_be_bytes());

    if let Some((aaguid, credential_id, cose_key)) = attested {
        data.extend_from_slice(&aaguid);
        data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        data.extend_from_slice(&credential_id);
        data.extend_from_slice(&cose_key);
    }

    data
}

pub(crate) fn make_attestation_object(fmt: &str, auth_data: &[u8]) -> String {
    let map = CborValue::Map(vec![
        (
            CborValue::Text("fmt".to_string()),
            CborValue::Text(fmt.to_string()),
        ),
        (
            CborValue::Text("attStmt".to_string()),
            CborValue::Map(vec![]),
        ),
        (
            CborValue::Text("authData".to_string()),
            CborValue::Bytes(auth_data.to_vec()),
        ),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&map, &mut out).unwrap();
    base64url(&out)
}

/// A fake authenticator: one P-256 key pair plus a fixed credential id.
pub(crate) struct TestAuthenticator {
    key: EcdsaKeyPair,
    rng: SystemRandom,
    pub(crate) credential_id: Vec<u8>,
    pub(crate) aaguid: [u8; 16],
}

impl TestAuthenticator {
    pub(crate) fn new(credential_id: &[u8]) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let key =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .unwrap();
        Self {
            key,
            rng,
            credential_id: credential_id.to_vec(),
            aaguid: [0x42; 16],
        }
    }

    /// Uncompressed point, 0x04 || x || y.
    pub(crate) fn public_key(&self) -> Vec<u8> {
        self.key.public_key().as_ref().to_vec()
    }

    pub(crate) fn cose_public_key(&self) -> Vec<u8> {
        let point = self.public_key();
        cose_ec2_key(&point[1..33], &point[33..65])
    }

    /// Authenticator data for a registration response carrying this
    /// credential.
    pub(crate) fn registration_auth_data(&self, rp_id: &str, flags: u8) -> Vec<u8> {
        make_auth_data(
            rp_id,
            flags,
            0,
            Some((
                self.aaguid,
                self.credential_id.clone(),
                self.cose_public_key(),
            )),
        )
    }

    /// Sign `auth_data || SHA256(client_data)` the way an authenticator
    /// answers a get() ceremony. Returns the base64url DER signature.
    pub(crate) fn sign_assertion(&self, auth_data: &[u8], client_data_json_b64: &str) -> String {
        let raw_client_data = crate::utils::base64url_decode(client_data_json_b64).unwrap();
        let client_data_hash = digest::digest(&digest::SHA256, &raw_client_data);
        let mut signed_data = Vec::with_capacity(auth_data.len() + 32);
        signed_data.extend_from_slice(auth_data);
        signed_data.extend_from_slice(client_data_hash.as_ref());

        let signature = self.key.sign(&self.rng, &signed_data).unwrap();
        base64url(signature.as_ref())
    }
}
