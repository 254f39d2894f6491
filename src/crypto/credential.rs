use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// The admin credential the local gate compares against.
///
/// ⚠️ This only gates the client UI. Real authorization happens on the backend.
#[derive(Clone)]
pub struct AdminSecret {
    secret: Zeroizing<String>,
}

impl AdminSecret {
    /// Creates a new `AdminSecret`.
    pub fn new(secret: Zeroizing<String>) -> Self {
        Self { secret }
    }

    /// Compares a candidate credential in constant time.
    ///
    /// # Arguments
    ///
    /// * `candidate` - The credential entered by the user.
    ///
    /// # Returns
    ///
    /// `true` if the candidate matches the configured secret.
    pub fn verify(&self, candidate: &str) -> bool {
        let expected = self.secret.as_bytes();
        let candidate = candidate.as_bytes();

        if expected.is_empty() {
            return false;
        }

        expected.ct_eq(candidate).into()
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminSecret(***)")
    }
}
