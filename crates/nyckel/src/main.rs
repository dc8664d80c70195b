#![forbid(unsafe_code)]

//! Nyckel CLI: generate JWT signing keys from templates and sign tokens.

use clap::{Args, Parser, Subcommand};
use nyckel_core::Error;
use nyckel_jwt::RawJwt;
use nyckel_keys::jwt_rsa::parameters::KidStrategy;
use nyckel_keys::jwt_rsa::{self, JwtRsaSsaPkcs1SignKeyManager};
use nyckel_keys::{
    KeyData, KeyManagerRegistry, KeysetKey, Parameters, ParametersRegistry, PrimitiveKind,
    RegistryConfig,
};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "nyckel",
    about = "Nyckel: key manager registry and JWT RSA signing keys",
    version
)]
struct Cli {
    /// Registry configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Restrict the registry to FIPS before registering key managers
    #[arg(long, global = true)]
    fips: bool,

    /// Treat the crypto backend as a FIPS-certified module
    #[arg(long = "fips-module", global = true)]
    fips_module: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List key templates
    Templates,

    /// Generate a keyset key from a template
    Keygen {
        /// Template name, e.g. JWT_RS256_2048_F4
        #[arg(short, long)]
        template: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Key id written into every token header (only with _RAW templates)
        #[arg(long = "custom-kid")]
        custom_kid: Option<String>,
    },

    /// Sign a set of claims with a keyset key
    Sign {
        /// Keyset key written by keygen
        #[arg(short = 'k', long)]
        key: PathBuf,

        #[command(flatten)]
        claims: ClaimArgs,

        /// kid header value (only for keys without a kid of their own)
        #[arg(long)]
        kid: Option<String>,
    },

    /// Extract the public keyset key of a private one
    PublicKey {
        /// Keyset key written by keygen
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show registered key types and FIPS status
    Info,
}

#[derive(Args, Default)]
struct ClaimArgs {
    /// Claims as a JSON object (default: {})
    #[arg(long)]
    claims: Option<String>,

    /// iss claim
    #[arg(long)]
    issuer: Option<String>,

    /// sub claim
    #[arg(long)]
    subject: Option<String>,

    /// aud claim
    #[arg(long)]
    audience: Option<String>,

    /// jti claim
    #[arg(long = "jwt-id")]
    jwt_id: Option<String>,

    /// Lifetime in seconds; sets iat, nbf and exp
    #[arg(long = "expires-in")]
    expires_in: Option<u64>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = build_registries(&cli).and_then(|(registry, parameters)| match cli.command {
        Commands::Templates => cmd_templates(&parameters),
        Commands::Keygen {
            template,
            output,
            custom_kid,
        } => cmd_keygen(&registry, &parameters, &template, output, custom_kid),
        Commands::Sign { key, claims, kid } => cmd_sign(&registry, &key, &claims, kid),
        Commands::PublicKey { key, output } => cmd_public_key(&registry, &key, output),
        Commands::Info => cmd_info(&registry),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_registries(cli: &Cli) -> Result<(KeyManagerRegistry, ParametersRegistry), Error> {
    let mut config = match &cli.config {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::default(),
    };
    config.fips_module_available |= cli.fips_module;
    debug!(?config, fips = cli.fips, "building registries");

    let registry = KeyManagerRegistry::new(&config);
    if cli.fips {
        registry.restrict_to_fips_if_empty()?;
    }
    let parameters = ParametersRegistry::new();
    nyckel_keys::register_all(&registry, &parameters)?;
    Ok((registry, parameters))
}

fn cmd_templates(parameters: &ParametersRegistry) -> Result<(), Error> {
    for name in parameters.names() {
        let Parameters::JwtRsaSsaPkcs1(p) = parameters.get(&name)?;
        let kid = match p.kid_strategy() {
            KidStrategy::Ignored => "no kid",
            KidStrategy::Base64EncodedKeyId => "kid from key id",
        };
        println!(
            "{name:<24} {} {:>5} bits  e={}  {kid}",
            p.algorithm(),
            p.modulus_size_bits(),
            p.public_exponent()
        );
    }
    Ok(())
}

fn cmd_keygen(
    registry: &KeyManagerRegistry,
    parameters: &ParametersRegistry,
    template: &str,
    output: Option<PathBuf>,
    custom_kid: Option<String>,
) -> Result<(), Error> {
    let params = parameters.get(template)?;
    let Parameters::JwtRsaSsaPkcs1(jwt_params) = &params;
    if custom_kid.is_some() && jwt_params.has_id_requirement() {
        return Err(Error::ConflictingKeyId(format!(
            "template {template} derives the kid from the key id; use the _RAW template with --custom-kid"
        )));
    }

    let mut key = registry.new_key(&params)?;
    if let Some(kid) = custom_kid {
        let manager = JwtRsaSsaPkcs1SignKeyManager::new(registry.fips_policy().clone());
        let private = jwt_rsa::with_custom_kid(manager.parse_key(&key.key_data.value)?, kid)?;
        key = key.with_key_data(KeyData::new(
            key.key_data.type_url.clone(),
            prost::Message::encode_to_vec(&private),
            key.key_data.key_material_type,
        ));
    }

    match key.kid() {
        Some(kid) => eprintln!("key id: {} (kid {kid})", key.key_id),
        None => eprintln!("key id: {}", key.key_id),
    }
    write_output(output, &key.encode_to_vec())
}

fn cmd_sign(
    registry: &KeyManagerRegistry,
    key_path: &Path,
    claims: &ClaimArgs,
    kid: Option<String>,
) -> Result<(), Error> {
    let key = read_keyset_key(key_path)?;
    let raw = build_claims(claims, unix_now()?)?;

    let signer = registry
        .keyset_primitive(&key, PrimitiveKind::JwtPublicKeySign)?
        .into_jwt_signer()
        .ok_or_else(|| Error::UnsupportedAlgorithm("key does not produce a JWT signer".into()))?;
    let token = match kid {
        Some(kid) if signer.keyset_kid().is_some() => {
            return Err(Error::ConflictingKeyId(format!(
                "key {} already signs with kid {:?}; --kid {kid:?} is only for keys without one",
                key.key_id,
                signer.keyset_kid().unwrap_or_default()
            )));
        }
        Some(kid) => signer.sign_and_encode_with_kid(&raw, Some(&kid))?,
        None => signer.sign_and_encode(&raw)?,
    };
    println!("{token}");
    Ok(())
}

fn cmd_public_key(
    registry: &KeyManagerRegistry,
    key_path: &Path,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let key = read_keyset_key(key_path)?;
    let public = registry
        .untyped(&key.key_data.type_url)?
        .public_key_data(&key.key_data.value)?;
    write_output(output, &key.with_key_data(public).encode_to_vec())
}

fn cmd_info(registry: &KeyManagerRegistry) -> Result<(), Error> {
    let fips = registry.fips_policy();
    println!("Nyckel key manager registry");
    println!();
    println!("FIPS-only mode:         {}", fips.is_restricted());
    println!("Certified FIPS module:  {}", fips.module_available());
    println!();
    println!("Registered key types:");
    for type_url in registry.type_urls() {
        let manager = registry.untyped(&type_url)?;
        let kinds: Vec<&str> = manager.primitive_kinds().iter().map(|k| k.name()).collect();
        println!(
            "  {type_url} (v{}, {}, new keys {})",
            manager.version(),
            kinds.join(", "),
            if registry.is_new_key_allowed(&type_url)? {
                "allowed"
            } else {
                "disallowed"
            }
        );
    }
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn read_keyset_key(path: &Path) -> Result<KeysetKey, Error> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::MalformedKeyData(format!("{}: {e}", path.display())))?;
    KeysetKey::decode(&bytes)
}

fn unix_now() -> Result<u64, Error> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| Error::Io(std::io::Error::other(e)))
}

/// Claims from `--claims` with the individual claim flags applied on top.
fn build_claims(args: &ClaimArgs, now: u64) -> Result<RawJwt, Error> {
    let mut raw = match &args.claims {
        Some(json) => RawJwt::from_json(json)?,
        None => RawJwt::new(),
    };
    if let Some(iss) = &args.issuer {
        raw = raw.with_issuer(iss.as_str());
    }
    if let Some(sub) = &args.subject {
        raw = raw.with_subject(sub.as_str());
    }
    if let Some(aud) = &args.audience {
        raw = raw.with_audience(aud.as_str());
    }
    if let Some(jti) = &args.jwt_id {
        raw = raw.with_jwt_id(jti.as_str());
    }
    if let Some(lifetime) = args.expires_in {
        let exp = now
            .checked_add(lifetime)
            .ok_or_else(|| Error::Encoding(format!("--expires-in {lifetime} overflows exp")))?;
        raw = raw
            .with_issued_at(now)
            .with_not_before(now)
            .with_expiration(exp);
    }
    Ok(raw)
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(Error::from),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(data).map_err(Error::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claim_flags_override_json() {
        let args = ClaimArgs {
            claims: Some(r#"{"sub":"bob","scope":"read"}"#.into()),
            issuer: Some("https://issuer.example".into()),
            subject: Some("alice".into()),
            audience: Some("api".into()),
            jwt_id: Some("id-1".into()),
            expires_in: Some(300),
        };
        let raw = build_claims(&args, 1_700_000_000).unwrap();
        let claims = raw.claims();
        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["scope"], "read");
        assert_eq!(claims["iss"], "https://issuer.example");
        assert_eq!(claims["aud"], "api");
        assert_eq!(claims["jti"], "id-1");
        assert_eq!(claims["iat"], json!(1_700_000_000u64));
        assert_eq!(claims["nbf"], json!(1_700_000_000u64));
        assert_eq!(claims["exp"], json!(1_700_000_300u64));
    }

    #[test]
    fn test_claims_default_to_empty() {
        let raw = build_claims(&ClaimArgs::default(), 0).unwrap();
        assert!(raw.claims().is_empty());
        assert!(matches!(
            build_claims(
                &ClaimArgs {
                    expires_in: Some(u64::MAX),
                    ..ClaimArgs::default()
                },
                1
            ),
            Err(Error::Encoding(_))
        ));
    }
}
