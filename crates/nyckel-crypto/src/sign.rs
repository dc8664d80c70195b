#![forbid(unsafe_code)]

//! RSA engine: key pair generation, CRT private key reconstruction and
//! RSASSA-PKCS1-v1_5 signing and verification.
//!
//! Signing goes through the `rsa` crate with base blinding, and every
//! signature is checked against the public key before it is returned.
//! Keys whose stored CRT values disagree with `d`, `p` and `q` are refused.

use crate::validators::MAX_RSA_MODULUS_SIZE;
use nyckel_core::{Error, HashType};
use num_bigint_dig::BigUint;
use num_traits::{One, Zero};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::debug;

/// The components of an RSA private key in CRT form.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateComponents {
    pub n: BigUint,
    pub e: BigUint,
    pub d: BigUint,
    pub p: BigUint,
    pub q: BigUint,
    pub dp: BigUint,
    pub dq: BigUint,
    pub qinv: BigUint,
}

impl std::fmt::Debug for RsaPrivateComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RSA private components ({} bits)", self.n.bits())
    }
}

/// A private key ready for signing, together with the CRT values it was stored with.
#[derive(Clone)]
pub struct RsaCrtPrivateKey {
    key: RsaPrivateKey,
    public: RsaPublicKey,
    dp: BigUint,
    dq: BigUint,
    qinv: BigUint,
}

impl std::fmt::Debug for RsaCrtPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RSA CRT private key ({} bits)", self.public.n().bits())
    }
}

impl RsaCrtPrivateKey {
    /// The public key built from the stored modulus and exponent.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn modulus_bits(&self) -> usize {
        self.public.n().bits()
    }

    /// Whether the stored dp, dq and CRT coefficient equal the values derived
    /// from d, p and q.
    pub fn crt_values_consistent(&self) -> bool {
        self.key.dp() == Some(&self.dp)
            && self.key.dq() == Some(&self.dq)
            && self.key.crt_coefficient().as_ref() == Some(&self.qinv)
    }
}

/// Generate a fresh RSA key pair.
///
/// CPU-bound and not cancelable; 4096-bit generation can take seconds.
pub fn generate_rsa_key_pair(
    modulus_bits: usize,
    public_exponent: &BigUint,
) -> Result<RsaPrivateComponents, Error> {
    debug!(modulus_bits, "generating RSA key pair");
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new_with_exp(&mut rng, modulus_bits, public_exponent)
        .map_err(|e| Error::Crypto(format!("RSA key generation failed: {e}")))?;

    let [p, q] = key.primes() else {
        return Err(Error::Crypto(format!(
            "expected a two-prime RSA key, got {} primes",
            key.primes().len()
        )));
    };
    let dp = key
        .dp()
        .ok_or_else(|| Error::Crypto("missing CRT exponent dp".into()))?;
    let dq = key
        .dq()
        .ok_or_else(|| Error::Crypto("missing CRT exponent dq".into()))?;
    let qinv = key
        .crt_coefficient()
        .ok_or_else(|| Error::Crypto("missing CRT coefficient".into()))?;

    Ok(RsaPrivateComponents {
        n: key.n().clone(),
        e: key.e().clone(),
        d: key.d().clone(),
        p: p.clone(),
        q: q.clone(),
        dp: dp.clone(),
        dq: dq.clone(),
        qinv,
    })
}

/// Build a public key from its modulus and exponent.
pub fn public_key_from_components(n: &BigUint, e: &BigUint) -> Result<RsaPublicKey, Error> {
    RsaPublicKey::new_with_max_size(n.clone(), e.clone(), MAX_RSA_MODULUS_SIZE)
        .map_err(|err| Error::InvalidKeyComponents(format!("public key: {err}")))
}

/// Rebuild a signing key from stored components.
///
/// Only structural problems are rejected here (zero or degenerate values,
/// an unusable public key). The relation n = p·q is not checked.
pub fn reconstruct_private_key(c: &RsaPrivateComponents) -> Result<RsaCrtPrivateKey, Error> {
    let named = [
        ("n", &c.n),
        ("e", &c.e),
        ("d", &c.d),
        ("p", &c.p),
        ("q", &c.q),
        ("dp", &c.dp),
        ("dq", &c.dq),
        ("crt", &c.qinv),
    ];
    for (name, value) in named {
        if value.is_zero() {
            return Err(Error::InvalidKeyComponents(format!("{name} is zero")));
        }
    }
    if c.p.is_one() || c.q.is_one() {
        return Err(Error::InvalidKeyComponents("prime factor is one".into()));
    }

    let public = public_key_from_components(&c.n, &c.e)?;
    let mut key = RsaPrivateKey::from_components(
        c.n.clone(),
        c.e.clone(),
        c.d.clone(),
        vec![c.p.clone(), c.q.clone()],
    )
    .map_err(|e| Error::InvalidKeyComponents(format!("private key: {e}")))?;
    key.precompute()
        .map_err(|e| Error::InvalidKeyComponents(format!("CRT precomputation: {e}")))?;

    Ok(RsaCrtPrivateKey {
        key,
        public,
        dp: c.dp.clone(),
        dq: c.dq.clone(),
        qinv: c.qinv.clone(),
    })
}

/// Sign `message` with RSASSA-PKCS1-v1_5 under `hash`.
pub fn sign(key: &RsaCrtPrivateKey, hash: HashType, message: &[u8]) -> Result<Vec<u8>, Error> {
    use signature::{RandomizedSigner, SignatureEncoding};
    if !key.crt_values_consistent() {
        return Err(Error::Crypto(
            "stored CRT values do not match the private key; refusing to sign".into(),
        ));
    }
    let mut rng = rand::thread_rng();
    macro_rules! do_sign {
        ($hasher:ty) => {{
            let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(key.key.clone());
            sk.try_sign_with_rng(&mut rng, message)
                .map(|sig| sig.to_vec())
                .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))
        }};
    }
    match hash {
        HashType::Sha256 => do_sign!(sha2::Sha256),
        HashType::Sha384 => do_sign!(sha2::Sha384),
        HashType::Sha512 => do_sign!(sha2::Sha512),
    }
}

/// Verify an RSASSA-PKCS1-v1_5 signature.
pub fn verify(
    public_key: &RsaPublicKey,
    hash: HashType,
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<bool, Error> {
    use signature::Verifier;
    let sig = rsa::pkcs1v15::Signature::try_from(signature_bytes)
        .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
    macro_rules! do_verify {
        ($hasher:ty) => {{
            let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(public_key.clone());
            Ok(vk.verify(message, &sig).is_ok())
        }};
    }
    match hash {
        HashType::Sha256 => do_verify!(sha2::Sha256),
        HashType::Sha384 => do_verify!(sha2::Sha384),
        HashType::Sha512 => do_verify!(sha2::Sha512),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::OnceLock;

    /// One 2048-bit key per test binary; generation dominates test time.
    pub(crate) fn test_components() -> &'static RsaPrivateComponents {
        static KEY: OnceLock<RsaPrivateComponents> = OnceLock::new();
        KEY.get_or_init(|| {
            generate_rsa_key_pair(2048, &BigUint::from(65537u32)).expect("keygen")
        })
    }

    #[test]
    fn test_generate_produces_consistent_components() {
        let c = test_components();
        assert_eq!(c.n.bits(), 2048);
        assert_eq!(c.e, BigUint::from(65537u32));
        assert_eq!(&c.p * &c.q, c.n);
    }

    #[test]
    fn test_sign_verify_roundtrip_all_hashes() {
        let key = reconstruct_private_key(test_components()).unwrap();
        for hash in [HashType::Sha256, HashType::Sha384, HashType::Sha512] {
            let sig = sign(&key, hash, b"payload").unwrap();
            assert_eq!(sig.len(), 256);
            assert!(verify(key.public_key(), hash, b"payload", &sig).unwrap());
            assert!(!verify(key.public_key(), hash, b"other payload", &sig).unwrap());
        }
    }

    #[test]
    fn test_signature_matches_rsa_crate() {
        use signature::{SignatureEncoding, Signer};
        let c = test_components();
        let reference = RsaPrivateKey::from_components(
            c.n.clone(),
            c.e.clone(),
            c.d.clone(),
            vec![c.p.clone(), c.q.clone()],
        )
        .unwrap();
        let sk = rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new(reference);
        let expected = sk.sign(b"deterministic").to_vec();

        let key = reconstruct_private_key(c).unwrap();
        assert_eq!(sign(&key, HashType::Sha256, b"deterministic").unwrap(), expected);
    }

    #[test]
    fn test_reconstructed_key_has_consistent_crt_values() {
        let key = reconstruct_private_key(test_components()).unwrap();
        assert!(key.crt_values_consistent());
    }

    #[test]
    fn test_faulted_crt_values_never_yield_a_signature() {
        let faults: [fn(&mut RsaPrivateComponents); 3] = [
            |c| c.qinv = &c.qinv + BigUint::one(),
            |c| c.dp = &c.dp + BigUint::one(),
            |c| c.dq = &c.dq + BigUint::one(),
        ];
        for fault in faults {
            let mut c = test_components().clone();
            fault(&mut c);
            let key = reconstruct_private_key(&c).unwrap();
            assert!(!key.crt_values_consistent());
            assert!(matches!(
                sign(&key, HashType::Sha256, b"payload"),
                Err(Error::Crypto(_))
            ));
        }
    }

    #[test]
    fn test_inconsistent_modulus_never_yields_a_signature() {
        // n no longer equals p·q: the check against the public key catches it
        let mut c = test_components().clone();
        c.n = &c.n + BigUint::from(2u32);
        let key = reconstruct_private_key(&c).unwrap();
        assert!(sign(&key, HashType::Sha256, b"payload").is_err());
    }

    #[test]
    fn test_reconstruct_rejects_zero_component() {
        let mut c = test_components().clone();
        c.dq = BigUint::zero();
        let err = reconstruct_private_key(&c).unwrap_err();
        assert!(matches!(err, Error::InvalidKeyComponents(msg) if msg.contains("dq")));
    }

    #[test]
    fn test_reconstruct_rejects_unusable_public_exponent() {
        let mut c = test_components().clone();
        c.e = BigUint::one();
        assert!(matches!(
            reconstruct_private_key(&c),
            Err(Error::InvalidKeyComponents(_))
        ));
    }
}
