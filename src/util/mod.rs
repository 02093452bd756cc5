pub(crate) const TMP_ID_PREFIX: &str = "tmp-";

pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Provisional id for a row that has not been committed yet.
pub(crate) fn make_tmp_id(now_ms: i64, rand: u64) -> String {
    format!("{TMP_ID_PREFIX}{now_ms}-{rand:x}")
}

pub(crate) fn is_tmp_id(id: &str) -> bool {
    id.starts_with(TMP_ID_PREFIX)
}

/// Entropy for provisional ids. Falls back to a counter if the platform source fails.
pub(crate) fn random_u64() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static FALLBACK: AtomicU64 = AtomicU64::new(1);

    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(_) => FALLBACK.fetch_add(1, Ordering::Relaxed),
    }
}

pub(crate) fn new_tmp_id() -> String {
    make_tmp_id(now_ms(), random_u64())
}
