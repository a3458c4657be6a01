//! Rough token accounting for completion requests.
//!
//! The completion endpoint bills by token, but an exact tokenizer is a heavy
//! dependency for what is only a courtesy figure in responses. The usual
//! ~4 characters per token approximation is close enough for sizing.

/// Estimate the token count of a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}
