//! Concurrent fan-out of one fetch over many task ids
//!
//! [`fetch_for_many`] launches every fetch at once and leaves the actual
//! bound on in-flight requests to the client's throttle gate. Results come
//! back paired with their id, in input order. The first failure aborts the
//! whole batch and drops the fetches still running.
//!
//! [`fetch_for_many_chunked`] splits the ids into fixed-size chunks, runs
//! each chunk through [`fetch_for_many`], and pauses between chunks.

use std::future::Future;

use futures::future::try_join_all;

use crate::config::BatchConfig;
use crate::error::Result;

/// `(id, result)` pairs in the order the ids were given
pub type BatchResults<T> = Vec<(String, T)>;

/// Position of a chunk within a chunked fan-out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkProgress {
    /// One-based chunk index
    pub index: usize,
    /// Number of chunks
    pub total: usize,
    /// Ids in this chunk
    pub size: usize,
}

/// Number of chunks needed for `len` ids at `chunk_size` per chunk
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size.max(1))
}

/// Run `fetch` for every id concurrently
///
/// An empty id list returns an empty result without calling `fetch`.
pub async fn fetch_for_many<T, F, Fut>(ids: &[String], fetch: F) -> Result<BatchResults<T>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let fetches = ids.iter().map(|id| {
        let fut = fetch(id.clone());
        async move { fut.await.map(|value| (id.clone(), value)) }
    });

    try_join_all(fetches).await
}

/// Run `fetch` for every id, one chunk at a time
///
/// `on_chunk` is called before each chunk starts. Chunks run sequentially
/// with `config.inter_chunk_delay` between them (none after the last). Any
/// failure aborts the remaining chunks.
pub async fn fetch_for_many_chunked<T, F, Fut, P>(
    ids: &[String],
    fetch: F,
    config: &BatchConfig,
    mut on_chunk: P,
) -> Result<BatchResults<T>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(ChunkProgress),
{
    let chunk_size = config.chunk_size.max(1);
    let total = chunk_count(ids.len(), chunk_size);
    let mut results = Vec::with_capacity(ids.len());

    for (i, chunk) in ids.chunks(chunk_size).enumerate() {
        on_chunk(ChunkProgress {
            index: i + 1,
            total,
            size: chunk.len(),
        });
        tracing::debug!(chunk = i + 1, total, size = chunk.len(), "Fetching chunk");

        results.extend(fetch_for_many(chunk, &fetch).await?);

        if i + 1 < total && !config.inter_chunk_delay.is_zero() {
            tokio::time::sleep(config.inter_chunk_delay).await;
        }
    }

    Ok(results)
}
