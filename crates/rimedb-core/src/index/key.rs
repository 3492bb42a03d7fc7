///
/// IndexKeyBuilder
///
/// Accumulates one index key. Data bytes are stuffed so the delimiter and
/// infinity markers stay unambiguous in the key stream:
///
/// - data `0x00` → `0x00 0xFF`
/// - data `0xFF` → `0xFF 0x00`
/// - delimiter   → `0x00 0x01`, sorts before every escaped data byte
/// - infinity    → `0xFF 0xFF`, sorts after every escaped data byte
///
/// The escape map is order-preserving per byte, so lexicographic order of
/// built keys matches field-tuple order, a delimited shorter key sorts
/// before every longer key sharing its prefix, and no two distinct field
/// sequences concatenate to the same bytes.
///

#[derive(Clone, Debug, Default)]
pub struct IndexKeyBuilder {
    buf: Vec<u8>,
}

impl IndexKeyBuilder {
    /// Field separator, emitted between successive fields.
    pub const DELIMITER: [u8; 2] = [0x00, 0x01];

    /// Open upper bound for range scans; sorts after every encoded value.
    pub const INFINITY: [u8; 2] = [0xFF, 0xFF];

    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append raw data bytes through the escape map.
    pub fn add(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            match byte {
                0x00 => self.buf.extend_from_slice(&[0x00, 0xFF]),
                0xFF => self.buf.extend_from_slice(&[0xFF, 0x00]),
                data => self.buf.push(data),
            }
        }
    }

    /// Append a string's UTF-8 bytes, no length prefix; scan correctness
    /// relies on the delimiter, not framing.
    pub fn add_text(&mut self, text: &str) {
        self.add(text.as_bytes());
    }

    /// Append a signed 64-bit value in its order-preserving 8-byte form.
    pub fn add_i64(&mut self, value: i64) {
        self.add(&ordered_i64_bytes(value));
    }

    pub fn delimiter(&mut self) {
        self.buf.extend_from_slice(&Self::DELIMITER);
    }

    pub fn infinity(&mut self) {
        self.buf.extend_from_slice(&Self::INFINITY);
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Reset the buffer so one allocation serves many keys.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Bias the sign bit so signed order matches unsigned byte order.
const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    let biased = value.cast_unsigned() ^ (1u64 << 63);
    biased.to_be_bytes()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn key(build: impl FnOnce(&mut IndexKeyBuilder)) -> Vec<u8> {
        let mut builder = IndexKeyBuilder::new();
        build(&mut builder);
        builder.into_bytes()
    }

    #[test]
    fn escape_golden_vectors_freeze_the_byte_scheme() {
        assert_eq!(
            key(|k| k.add(&[0x00, 0x41, 0xFF])),
            vec![0x00, 0xFF, 0x41, 0xFF, 0x00]
        );
        assert_eq!(key(|k| k.delimiter()), vec![0x00, 0x01]);
        assert_eq!(key(|k| k.infinity()), vec![0xFF, 0xFF]);
    }

    #[test]
    fn biased_integer_golden_vectors() {
        // 0 biases to 0x80 00.. 00; the seven 0x00 bytes are escaped.
        let zero = key(|k| k.add_i64(0));
        assert_eq!(zero[0], 0x80);
        assert_eq!(zero.len(), 1 + 7 * 2);

        // -1 biases to 0x7F FF.. FF; the seven 0xFF bytes are escaped.
        let minus_one = key(|k| k.add_i64(-1));
        assert_eq!(minus_one[0], 0x7F);
        assert_eq!(&minus_one[1..3], &[0xFF, 0x00]);
    }

    #[test]
    fn delimiter_sorts_before_any_data_continuation() {
        let prefix = b"ab";
        let shorter = key(|k| {
            k.add(prefix);
            k.delimiter();
            k.add_i64(i64::MAX);
        });

        for continuation in [&[0x00u8][..], &[0x01], &[b'c'], &[0xFF]] {
            let longer = key(|k| {
                k.add(prefix);
                k.add(continuation);
            });
            assert_eq!(
                shorter.cmp(&longer),
                Ordering::Less,
                "delimited prefix must sort before continuation {continuation:?}"
            );
        }
    }

    #[test]
    fn infinity_sorts_after_any_encoded_value() {
        let upper = key(|k| k.infinity());

        for value in [&[0x00u8][..], &[0xFF], &[0xFF, 0xFF], b"zzzz", &[0xFE; 16]] {
            let data = key(|k| k.add(value));
            assert_eq!(
                data.cmp(&upper),
                Ordering::Less,
                "value {value:?} must sort below infinity"
            );
        }
    }

    #[test]
    fn distinct_field_sequences_never_collide() {
        // A literal delimiter inside field data is escaped, so splitting
        // "a" / "b" can never collide with the single field "a\x00\x01b".
        let split = key(|k| {
            k.add_text("a");
            k.delimiter();
            k.add_text("b");
        });
        let fused = key(|k| k.add(&[b'a', 0x00, 0x01, b'b']));

        assert_ne!(split, fused);
    }

    proptest! {
        #[test]
        fn escaped_bytes_order_like_raw_bytes(a: Vec<u8>, b: Vec<u8>) {
            let ka = key(|k| k.add(&a));
            let kb = key(|k| k.add(&b));
            prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
        }

        #[test]
        fn biased_integers_order_like_signed_integers(a: i64, b: i64) {
            let ka = key(|k| k.add_i64(a));
            let kb = key(|k| k.add_i64(b));
            prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
        }

        #[test]
        fn two_field_keys_order_like_tuples(a1: Vec<u8>, b1: i64, a2: Vec<u8>, b2: i64) {
            let k1 = key(|k| {
                k.add(&a1);
                k.delimiter();
                k.add_i64(b1);
            });
            let k2 = key(|k| {
                k.add(&a2);
                k.delimiter();
                k.add_i64(b2);
            });
            prop_assert_eq!((a1, b1).cmp(&(a2, b2)), k1.cmp(&k2));
        }
    }
}
