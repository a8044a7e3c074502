//! Email-domain approvals
//!
//! A key holder approves a digest by sending an email whose subject carries
//! `0x<digest>`. Two checks make it count:
//!
//! 1. The mail domain's registered ed25519 key signed the canonicalized
//!    header block (relaxed canonicalization: lowercase names, folded and
//!    collapsed whitespace, `\r\n` line endings).
//! 2. A succinct proof, checked by the [`ProofVerifier`](crate::ProofVerifier),
//!    attests to the public inputs derived from those headers, so the sender
//!    address itself never appears in the committed identity.
//!
//! The `Date` header bounds freshness: approvals older than
//! `email_max_age_secs` are expired.

use chrono::DateTime;
use keyward_crypto::{sha256, verify_ed25519, Ed25519KeyPair};
use keyward_types::{CredentialError, IdentityCommitment, H256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::VerificationContext;
use crate::credential::VerifyCredential;
use crate::identity::email_identity;
use crate::registry::EmailPublicInputs;

/// Domain-signed email headers plus a proof over their public inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailProof {
    /// Key selector published by the mail domain
    pub selector: String,
    /// Signing mail domain
    pub domain: String,
    /// Header block as received
    pub headers: String,
    /// Domain key's signature over the canonicalized headers
    #[serde(with = "keyward_types::serde_hex")]
    pub signature: Vec<u8>,
    /// Per-key salt hiding the sender address
    pub pepper: H256,
    /// Opaque succinct proof blob
    #[serde(with = "keyward_types::serde_hex", default)]
    pub proof: Vec<u8>,
}

/// Headers extracted from a canonicalized block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeaders {
    pub canonical: String,
    pub from: String,
    pub subject: String,
    pub date: String,
}

/// Relaxed header canonicalization.
///
/// Continuation lines are unfolded, names are lowercased, runs of whitespace
/// in values collapse to one space, and every line ends in `\r\n`.
pub fn canonicalize_headers(raw: &str) -> Result<String, CredentialError> {
    let mut unfolded: Vec<String> = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            let last = unfolded
                .last_mut()
                .ok_or_else(|| CredentialError::malformed("header block starts with a continuation"))?;
            last.push(' ');
            last.push_str(line.trim());
        } else {
            unfolded.push(line.to_string());
        }
    }
    if unfolded.is_empty() {
        return Err(CredentialError::malformed("empty header block"));
    }

    let mut canonical = String::new();
    for line in unfolded {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| CredentialError::malformed(format!("header line without colon: {line}")))?;
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(CredentialError::malformed("empty header name"));
        }
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        canonical.push_str(&name);
        canonical.push(':');
        canonical.push_str(&value);
        canonical.push_str("\r\n");
    }
    Ok(canonical)
}

/// Canonicalize and pick out the headers an approval needs
pub fn parse_headers(raw: &str) -> Result<ParsedHeaders, CredentialError> {
    let canonical = canonicalize_headers(raw)?;
    let mut from = None;
    let mut subject = None;
    let mut date = None;
    for line in canonical.split("\r\n").filter(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match name {
            "from" => &mut from,
            "subject" => &mut subject,
            "date" => &mut date,
            _ => continue,
        };
        if slot.is_some() {
            return Err(CredentialError::malformed(format!("duplicate {name} header")));
        }
        *slot = Some(value.to_string());
    }

    let missing = |name: &str| CredentialError::malformed(format!("missing {name} header"));
    Ok(ParsedHeaders {
        from: extract_address(&from.ok_or_else(|| missing("from"))?)?,
        subject: subject.ok_or_else(|| missing("subject"))?,
        date: date.ok_or_else(|| missing("date"))?,
        canonical,
    })
}

/// `Alice <alice@example.com>` -> `alice@example.com`
fn extract_address(from: &str) -> Result<String, CredentialError> {
    let address = match (from.rfind('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => &from[start + 1..end],
        _ => from,
    };
    let address = address.trim().to_ascii_lowercase();
    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(address),
        _ => Err(CredentialError::malformed(format!("invalid sender address: {from}"))),
    }
}

/// Header block for an approval email, as a mail client would send it
pub fn approval_headers(from: &str, to: &str, digest: &H256, sent_at: u64) -> String {
    let date = i64::try_from(sent_at)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc2822())
        .unwrap_or_default();
    format!(
        "From: <{from}>\r\nTo: <{to}>\r\nSubject: Approve {}\r\nDate: {date}\r\n",
        digest.to_hex()
    )
}

impl EmailProof {
    /// Sign a header block as the mail domain would. The proof blob is
    /// attached afterwards with [`with_proof`](Self::with_proof).
    pub fn sign(
        domain_key: &Ed25519KeyPair,
        selector: &str,
        domain: &str,
        headers: &str,
        pepper: H256,
    ) -> Result<Self, CredentialError> {
        let canonical = canonicalize_headers(headers)?;
        Ok(Self {
            selector: selector.to_string(),
            domain: domain.to_ascii_lowercase(),
            headers: headers.to_string(),
            signature: domain_key.sign(canonical.as_bytes()).to_vec(),
            pepper,
            proof: Vec::new(),
        })
    }

    pub fn with_proof(mut self, proof: Vec<u8>) -> Self {
        self.proof = proof;
        self
    }

    /// Identity of the sender, if the headers parse
    pub fn sender_identity(&self) -> Result<IdentityCommitment, CredentialError> {
        let parsed = parse_headers(&self.headers)?;
        Ok(email_identity(&parsed.from, &self.pepper))
    }

    /// Public inputs the proof must attest to for `digest`
    pub fn public_inputs(&self, digest: &H256) -> Result<EmailPublicInputs, CredentialError> {
        let parsed = parse_headers(&self.headers)?;
        Ok(self.inputs_for(&parsed, digest))
    }

    fn inputs_for(&self, parsed: &ParsedHeaders, digest: &H256) -> EmailPublicInputs {
        EmailPublicInputs {
            header_hash: sha256(parsed.canonical.as_bytes()),
            from_hash: *email_identity(&parsed.from, &self.pepper).hash(),
            digest: *digest,
            domain: self.domain.to_ascii_lowercase(),
        }
    }

    fn check_freshness(
        &self,
        parsed: &ParsedHeaders,
        ctx: &VerificationContext<'_>,
    ) -> Result<(), CredentialError> {
        let sent = DateTime::parse_from_rfc2822(&parsed.date)
            .map_err(|e| CredentialError::malformed(format!("date header: {e}")))?;
        let sent = u64::try_from(sent.timestamp())
            .map_err(|_| CredentialError::malformed("date header before the epoch"))?;

        if sent > ctx.now.saturating_add(ctx.policy.clock_skew_secs) {
            return Err(CredentialError::malformed(format!(
                "date header {sent} is in the future (now {})",
                ctx.now
            )));
        }
        let expires_at = sent.saturating_add(ctx.policy.email_max_age_secs);
        if ctx.now > expires_at {
            return Err(CredentialError::ExpiredCredential {
                expired_at: expires_at,
                now: ctx.now,
            });
        }
        Ok(())
    }
}

impl VerifyCredential for EmailProof {
    fn verify(
        &self,
        digest: &H256,
        ctx: &VerificationContext<'_>,
    ) -> Result<IdentityCommitment, CredentialError> {
        let parsed = parse_headers(&self.headers)?;

        let domain_key = ctx
            .domain_keys
            .domain_key(&self.selector, &self.domain)
            .ok_or_else(|| CredentialError::UnknownIssuer {
                issuer: format!("{}._domainkey.{}", self.selector, self.domain),
            })?;
        let signature: [u8; 64] = self.signature.as_slice().try_into().map_err(|_| {
            CredentialError::bad_signature(format!(
                "domain signature must be 64 bytes, got {}",
                self.signature.len()
            ))
        })?;
        verify_ed25519(&domain_key, parsed.canonical.as_bytes(), &signature)
            .map_err(|e| CredentialError::bad_signature(e.to_string()))?;

        let sender_domain = parsed.from.rsplit('@').next().unwrap_or_default();
        if !sender_domain.eq_ignore_ascii_case(&self.domain) {
            return Err(CredentialError::bad_signature(format!(
                "sender domain {sender_domain} is not the signing domain {}",
                self.domain
            )));
        }

        if !parsed
            .subject
            .to_ascii_lowercase()
            .contains(&digest.to_hex())
        {
            return Err(CredentialError::DigestMismatch {
                expected: *digest,
                found: parsed.subject.clone(),
            });
        }

        self.check_freshness(&parsed, ctx)?;

        let inputs = self.inputs_for(&parsed, digest);
        match ctx.proof_verifier.verify(&inputs, &self.proof) {
            Ok(true) => {}
            Ok(false) => {
                return Err(CredentialError::ProofVerificationFailed {
                    reason: format!("proof rejected for domain {}", inputs.domain),
                })
            }
            Err(reason) => return Err(CredentialError::malformed(reason)),
        }

        debug!(domain = %self.domain, selector = %self.selector, "email approval verified");
        Ok(IdentityCommitment::new(inputs.from_hash))
    }
}
