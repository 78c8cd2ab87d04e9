//! Shared-secret verification for inbound webhook requests.
//!
//! The sender presents the secret as a plain `token` query parameter.  The
//! comparison is constant-time so the check does not leak how much of the
//! token matched.

use anyhow::Result;
use subtle::ConstantTimeEq;

/// Check the presented token against the configured secret.
pub fn verify_token(presented: Option<&str>, expected: &str) -> Result<()> {
    let presented = match presented {
        Some(t) => t,
        None => anyhow::bail!("missing webhook token"),
    };

    if presented.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        anyhow::bail!("webhook token mismatch")
    }
}
