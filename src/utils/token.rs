use rand::{distributions::Uniform, thread_rng, Rng};

/// Random decimal code of `length` digits, leading zeros allowed.
pub fn generate_numeric_code(length: usize) -> String {
    thread_rng()
        .sample_iter(Uniform::new_inclusive(0u8, 9))
        .take(length)
        .map(|d| char::from(b'0' + d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_digits_of_requested_length() {
        for _ in 0..50 {
            let code = generate_numeric_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
