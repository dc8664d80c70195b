#![forbid(unsafe_code)]

//! Key self-tests run right after a private key is reconstructed.

use crate::sign::{self, RsaCrtPrivateKey};
use nyckel_core::{Error, HashType};
use rsa::RsaPublicKey;
use tracing::warn;

const TEST_MESSAGE: &[u8] = b"Tink and Wycheproof.";

/// Sign a fixed test message with `private_key` and verify it with `public_key`.
///
/// Any failure, including an error while signing, is reported as
/// [`Error::SelfTestFailure`].
pub fn validate_rsa_ssa_pkcs1(
    private_key: &RsaCrtPrivateKey,
    public_key: &RsaPublicKey,
    hash: HashType,
) -> Result<(), Error> {
    let signature = sign::sign(private_key, hash, TEST_MESSAGE).map_err(|e| {
        warn!(error = %e, "RSA self-test could not sign test message");
        Error::SelfTestFailure(format!("RSA PKCS1 signing with {} failed: {e}", hash.name()))
    })?;

    match sign::verify(public_key, hash, TEST_MESSAGE, &signature) {
        Ok(true) => Ok(()),
        Ok(false) => {
            warn!(hash = hash.name(), "RSA self-test signature did not verify");
            Err(Error::SelfTestFailure(format!(
                "RSA PKCS1 signature with {} did not verify; key material is corrupted",
                hash.name()
            )))
        }
        Err(e) => Err(Error::SelfTestFailure(format!(
            "RSA PKCS1 verification with {} failed: {e}",
            hash.name()
        ))),
    }
}
