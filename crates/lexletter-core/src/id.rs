// Unique identifier generation.

/// Alphabet for human-facing codes (coupon suffixes).
const CODE_ALPHABET: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Generate an opaque record id (21-character nanoid).
pub fn generate_id() -> String {
    nanoid::nanoid!()
}

/// Generate an uppercase alphanumeric code of the given length.
pub fn generate_code(len: usize) -> String {
    nanoid::nanoid!(len, &CODE_ALPHABET)
}
