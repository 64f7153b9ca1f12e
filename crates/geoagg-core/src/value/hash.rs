use crate::value::Value;
use xxhash_rust::xxh3::Xxh3;

/// Value-hash format version byte used by canonical digest encoding.
pub(crate) const VALUE_HASH_VERSION: u8 = 1;

/// Stable XXH3 seed used by canonical value hashing.
pub(crate) const VALUE_HASH_SEED: u64 = 0;

/// Canonical bit pattern every NaN hashes as.
const CANONICAL_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

fn feed_u8(h: &mut Xxh3, x: u8) {
    h.update(&[x]);
}
fn feed_u32(h: &mut Xxh3, x: u32) {
    h.update(&x.to_be_bytes());
}
fn feed_i64(h: &mut Xxh3, x: i64) {
    h.update(&x.to_be_bytes());
}
fn feed_u64(h: &mut Xxh3, x: u64) {
    h.update(&x.to_be_bytes());
}
fn feed_bytes(h: &mut Xxh3, b: &[u8]) {
    h.update(b);
}

#[cfg(test)]
thread_local! {
    static TEST_HASH_OVERRIDE: std::cell::Cell<Option<[u8; 16]>> =
        const { std::cell::Cell::new(None) };
}

// Execute one closure with a thread-local test hash override and always restore
// the previous override state, even if the closure panics.
#[cfg(test)]
pub(crate) fn with_test_hash_override<T>(
    override_hash: [u8; 16],
    f: impl FnOnce() -> T + std::panic::UnwindSafe,
) -> T {
    let previous = TEST_HASH_OVERRIDE.with(|cell| cell.replace(Some(override_hash)));
    let result = std::panic::catch_unwind(f);
    TEST_HASH_OVERRIDE.with(|cell| cell.set(previous));
    match result {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Hash one value into its canonical 128-bit digest.
#[must_use]
pub fn hash_value(value: &Value) -> [u8; 16] {
    #[cfg(test)]
    if let Some(digest) = TEST_HASH_OVERRIDE.with(std::cell::Cell::get) {
        return digest;
    }

    let mut h = Xxh3::with_seed(VALUE_HASH_SEED);
    feed_u8(&mut h, VALUE_HASH_VERSION);
    write_to_hasher(value, &mut h);

    h.digest128().to_be_bytes()
}

#[expect(clippy::cast_possible_truncation)]
fn write_to_hasher(value: &Value, h: &mut Xxh3) {
    feed_u8(h, value.canonical_tag().to_u8());

    match value {
        Value::Null => {}
        Value::Bool(b) => feed_u8(h, u8::from(*b)),
        Value::Int(i) => feed_i64(h, *i),
        Value::Float(f) => {
            let bits = if f.is_nan() {
                CANONICAL_NAN_BITS
            } else if *f == 0.0 {
                0
            } else {
                f.to_bits()
            };
            feed_u64(h, bits);
        }
        Value::Text(s) => {
            feed_u32(h, s.len() as u32);
            feed_bytes(h, s.as_bytes());
        }
        Value::List(items) => {
            feed_u32(h, items.len() as u32);
            for item in items {
                feed_u8(h, 0xFF); // item sentinel
                write_to_hasher(item, h);
            }
        }
        Value::Geometry(geometry) => {
            let wkt = geometry.to_wkt();
            feed_u32(h, wkt.len() as u32);
            feed_bytes(h, wkt.as_bytes());
        }
    }
}
