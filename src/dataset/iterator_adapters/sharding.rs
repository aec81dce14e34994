/// Part of `indices` worker `rank` out of `world_size` is responsible for.
///
/// Like a distributed sampler: the list is first padded by wrapping around so every worker
/// gets the same number of indices, then worker `rank` takes every `world_size`-th index
/// starting at `rank`.
pub fn shard_indices(indices: &[usize], rank: usize, world_size: usize) -> Vec<usize> {
    assert!(world_size > 0, "world size must be positive");
    assert!(rank < world_size, "rank {} is not below world size {}", rank, world_size);
    if indices.is_empty() {
        return vec![];
    }
    let per_worker = (indices.len() + world_size - 1) / world_size;
    let total = per_worker * world_size;
    indices
        .iter()
        .cycle()
        .take(total)
        .skip(rank)
        .step_by(world_size)
        .copied()
        .collect()
}
