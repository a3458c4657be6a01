//! Sensitive-information policy scan for conversations.
//!
//! Agents must never ask customers for credentials or card data. The scan
//! runs independently of the model evaluation so a flagged conversation is
//! recorded even when the model misses the violation.
//!
//! Matching is plain substring search over a lowercased copy of the text;
//! short terms like `pin` also match inside longer words (`opinion`). Flagged
//! rows land in a human audit queue, so the list of terms is the tuning knob,
//! not the matcher.

/// Terms that indicate an agent asked for sensitive information.
pub const RED_FLAGS: &[&str] = &[
    "credit card",
    "password",
    "cvv",
    "otp",
    "pin",
    "ssn",
    "account number",
];

/// Scan a conversation for red-flag terms, case-insensitively.
///
/// Returns true if any term occurs anywhere in the text.
pub fn detect_sensitive_info(conversation: &str) -> bool {
    let haystack = conversation.to_lowercase();
    RED_FLAGS.iter().any(|flag| haystack.contains(flag))
}
