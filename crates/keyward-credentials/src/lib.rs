//! Keyward Credentials - Credential kinds and their verifiers
//!
//! Every key in a keyset is verified by exactly one credential kind:
//!
//! - **Raw signature**: recoverable secp256k1 signature over the digest
//! - **Contract-delegated**: acceptance decided by a signer oracle
//! - **Email domain**: domain-signed headers plus a succinct proof
//! - **Identity token**: issuer-signed compact token whose nonce is the digest
//!
//! Verification resolves a credential to an [`IdentityCommitment`]. It is
//! pure given the same inputs, including the caller-supplied `now`; all
//! external lookups go through the read-only traits in [`registry`].
//!
//! [`IdentityCommitment`]: keyward_types::IdentityCommitment

pub mod identity;
pub mod registry;
pub mod context;
pub mod credential;
pub mod raw;
pub mod delegated;
pub mod email;
pub mod id_token;
pub mod session;

pub use identity::*;
pub use registry::*;
pub use context::*;
pub use credential::*;
pub use raw::*;
pub use delegated::*;
pub use email::{approval_headers, canonicalize_headers, EmailProof};
pub use id_token::{IdentityToken, TokenClaims, TokenHeader, TOKEN_ALG};
pub use session::*;
