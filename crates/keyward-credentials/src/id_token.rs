//! Identity-token approvals
//!
//! Compact three-part tokens `header.claims.signature`, each part base64url
//! without padding. Only `alg = EdDSA` is accepted; the issuer key is looked
//! up by `(iss, kid)`. The token approves a digest through its `nonce` claim.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use keyward_crypto::{verify_ed25519, Ed25519KeyPair};
use keyward_types::{CredentialError, IdentityCommitment, H256};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::context::VerificationContext;
use crate::credential::VerifyCredential;
use crate::identity::subject_identity;

/// The only signature algorithm accepted
pub const TOKEN_ALG: &str = "EdDSA";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub kid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
    /// `0x<digest>` being approved
    pub nonce: String,
}

impl TokenClaims {
    /// Claims approving `digest`, valid for `ttl_secs` from `issued_at`
    pub fn for_digest(
        iss: impl Into<String>,
        aud: impl Into<String>,
        sub: impl Into<String>,
        digest: &H256,
        issued_at: u64,
        ttl_secs: u64,
    ) -> Self {
        Self {
            iss: iss.into(),
            aud: aud.into(),
            sub: sub.into(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs),
            nonce: digest.to_hex(),
        }
    }
}

/// Compact issuer-signed identity token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityToken {
    pub token: String,
}

fn encode_part<T: Serialize>(value: &T) -> Result<String, CredentialError> {
    let json = serde_json::to_vec(value).map_err(|e| CredentialError::malformed(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_part<T: DeserializeOwned>(part: &str, what: &str) -> Result<T, CredentialError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| CredentialError::malformed(format!("token {what}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| CredentialError::malformed(format!("token {what}: {e}")))
}

impl IdentityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Issue a token as the issuer would
    pub fn issue(
        issuer_key: &Ed25519KeyPair,
        kid: &str,
        claims: &TokenClaims,
    ) -> Result<Self, CredentialError> {
        let header = TokenHeader {
            alg: TOKEN_ALG.to_string(),
            kid: kid.to_string(),
            typ: Some("JWT".to_string()),
        };
        let signing_input = format!("{}.{}", encode_part(&header)?, encode_part(claims)?);
        let signature = issuer_key.sign(signing_input.as_bytes());
        Ok(Self::new(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        )))
    }

    /// Split and decode without checking the signature
    pub fn decode(&self) -> Result<(TokenHeader, TokenClaims, [u8; 64]), CredentialError> {
        let mut parts = self.token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialError::malformed("token must have three parts"));
        };

        let header: TokenHeader = decode_part(header, "header")?;
        let claims: TokenClaims = decode_part(claims, "claims")?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| CredentialError::malformed(format!("token signature: {e}")))?;
        let signature: [u8; 64] = signature.as_slice().try_into().map_err(|_| {
            CredentialError::malformed(format!(
                "token signature must be 64 bytes, got {}",
                signature.len()
            ))
        })?;
        Ok((header, claims, signature))
    }

    fn signing_input(&self) -> &str {
        self.token
            .rsplit_once('.')
            .map(|(input, _)| input)
            .unwrap_or_default()
    }
}

impl VerifyCredential for IdentityToken {
    fn verify(
        &self,
        digest: &H256,
        ctx: &VerificationContext<'_>,
    ) -> Result<IdentityCommitment, CredentialError> {
        let (header, claims, signature) = self.decode()?;

        if header.alg != TOKEN_ALG {
            return Err(CredentialError::malformed(format!(
                "unsupported token algorithm {}",
                header.alg
            )));
        }

        let issuer_key = ctx
            .issuers
            .issuer_key(&claims.iss, &header.kid)
            .ok_or_else(|| CredentialError::UnknownIssuer {
                issuer: format!("{} (kid {})", claims.iss, header.kid),
            })?;
        verify_ed25519(&issuer_key, self.signing_input().as_bytes(), &signature)
            .map_err(|e| CredentialError::bad_signature(e.to_string()))?;

        if !ctx.issuers.is_audience_allowed(&claims.iss, &claims.aud) {
            return Err(CredentialError::NotAllowListed {
                what: format!("audience {} for issuer {}", claims.aud, claims.iss),
            });
        }

        if claims.exp <= ctx.now {
            return Err(CredentialError::ExpiredCredential {
                expired_at: claims.exp,
                now: ctx.now,
            });
        }
        if claims.iat > ctx.now.saturating_add(ctx.policy.clock_skew_secs) {
            return Err(CredentialError::malformed(format!(
                "token issued in the future ({} > {})",
                claims.iat, ctx.now
            )));
        }

        if !claims.nonce.eq_ignore_ascii_case(&digest.to_hex()) {
            return Err(CredentialError::DigestMismatch {
                expected: *digest,
                found: claims.nonce,
            });
        }

        debug!(iss = %claims.iss, aud = %claims.aud, "identity token verified");
        Ok(subject_identity(&claims.iss, &claims.sub))
    }
}
