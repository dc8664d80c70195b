#![forbid(unsafe_code)]

//! Validation of key versions and RSA parameters.

use nyckel_core::{Error, FipsPolicy};
use num_bigint_dig::BigUint;

/// Smallest RSA modulus accepted for any key.
pub const MIN_RSA_MODULUS_SIZE: usize = 2048;

/// Largest RSA modulus accepted, for generation and for stored keys alike.
pub const MAX_RSA_MODULUS_SIZE: usize = 16384;

/// Smallest RSA public exponent accepted (F4).
pub const MIN_RSA_PUBLIC_EXPONENT: u32 = 65537;

/// Modulus sizes permitted once the process is restricted to FIPS.
const FIPS_RSA_MODULUS_SIZES: [usize; 2] = [2048, 3072];

/// Reject key versions newer than `max_expected`.
pub fn validate_version(candidate: u32, max_expected: u32) -> Result<(), Error> {
    if candidate > max_expected {
        return Err(Error::InvalidKeyVersion {
            found: candidate,
            max: max_expected,
        });
    }
    Ok(())
}

pub fn validate_rsa_modulus_size(modulus_size: usize, fips: &FipsPolicy) -> Result<(), Error> {
    if modulus_size < MIN_RSA_MODULUS_SIZE {
        return Err(Error::InvalidModulusSize(format!(
            "modulus size is {modulus_size}; only modulus size >= {MIN_RSA_MODULUS_SIZE}-bit is supported"
        )));
    }
    if modulus_size > MAX_RSA_MODULUS_SIZE {
        return Err(Error::InvalidModulusSize(format!(
            "modulus size is {modulus_size}; only modulus size <= {MAX_RSA_MODULUS_SIZE}-bit is supported"
        )));
    }
    if fips.is_restricted() && !FIPS_RSA_MODULUS_SIZES.contains(&modulus_size) {
        return Err(Error::InvalidModulusSize(format!(
            "modulus size is {modulus_size}; only modulus sizes 2048 and 3072 are supported in FIPS mode"
        )));
    }
    Ok(())
}

pub fn validate_rsa_public_exponent(public_exponent: &BigUint) -> Result<(), Error> {
    let odd = public_exponent
        .to_bytes_be()
        .last()
        .is_some_and(|b| b & 1 == 1);
    if !odd {
        return Err(Error::InvalidPublicExponent(format!(
            "public exponent {public_exponent} must be odd"
        )));
    }
    if *public_exponent < BigUint::from(MIN_RSA_PUBLIC_EXPONENT) {
        return Err(Error::InvalidPublicExponent(format!(
            "public exponent {public_exponent} must be at least {MIN_RSA_PUBLIC_EXPONENT}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        validate_version(0, 0).unwrap();
        assert!(matches!(
            validate_version(1, 0),
            Err(Error::InvalidKeyVersion { found: 1, max: 0 })
        ));
    }

    #[test]
    fn test_modulus_boundary() {
        let fips = FipsPolicy::unrestricted();
        for bits in [2048, 3072, 4096] {
            validate_rsa_modulus_size(bits, &fips).unwrap();
        }
        assert!(matches!(
            validate_rsa_modulus_size(1024, &fips),
            Err(Error::InvalidModulusSize(_))
        ));
        assert!(validate_rsa_modulus_size(2047, &fips).is_err());
    }

    #[test]
    fn test_modulus_upper_bound() {
        let fips = FipsPolicy::unrestricted();
        validate_rsa_modulus_size(MAX_RSA_MODULUS_SIZE, &fips).unwrap();
        assert!(matches!(
            validate_rsa_modulus_size(20000, &fips),
            Err(Error::InvalidModulusSize(_))
        ));
    }

    #[test]
    fn test_modulus_under_fips() {
        let fips = FipsPolicy::new(true, true);
        validate_rsa_modulus_size(2048, &fips).unwrap();
        validate_rsa_modulus_size(3072, &fips).unwrap();
        assert!(matches!(
            validate_rsa_modulus_size(4096, &fips),
            Err(Error::InvalidModulusSize(_))
        ));
    }

    #[test]
    fn test_public_exponent() {
        validate_rsa_public_exponent(&BigUint::from(65537u32)).unwrap();
        validate_rsa_public_exponent(&BigUint::from(65539u32)).unwrap();
        assert!(matches!(
            validate_rsa_public_exponent(&BigUint::from(65538u32)),
            Err(Error::InvalidPublicExponent(_))
        ));
        assert!(matches!(
            validate_rsa_public_exponent(&BigUint::from(3u32)),
            Err(Error::InvalidPublicExponent(_))
        ));
    }
}
