/// Split ticket ids into contiguous batches of at most `size` ids.
///
/// Batch `k` holds `ids[k*size .. k*size+size]`; only the last batch may be short.
/// `size` is validated as non-zero by `Config`.
pub fn plan_batches(ids: &[u64], size: usize) -> Vec<Vec<u64>> {
  ids.chunks(size.max(1)).map(<[u64]>::to_vec).collect()
}
