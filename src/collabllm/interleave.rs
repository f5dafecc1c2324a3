//! Race-safe interleaving of concurrently producing chunk streams.
//!
//! Each phase of a protocol issues one gateway call per participating agent
//! and consumes the results as a single sequence. [`StreamInterleaver`]
//! merges the per-agent streams without ever dropping a chunk: it keeps one
//! in-flight pull per active source, parks resolved pulls in a completion
//! queue, and drains that queue completely after every wait before waiting
//! again. Reacting only to the first resolved pull and re-waiting would
//! silently lose the chunks of sources that finished in the same scheduling
//! tick; the drain pass is what makes the merge lossless.
//!
//! Chunks from one source are emitted in the order the source produced them.
//! No ordering is promised between different sources.

use crate::collabllm::gateway::{ChunkStream, GatewayChunk};
use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use std::collections::VecDeque;

/// A resolved pull: source index, next item (`None` = exhausted), and the
/// stream handed back for the next pull.
type PullResult = (usize, Option<GatewayChunk>, ChunkStream);

/// Merges N tagged chunk streams into one sequence.
pub struct StreamInterleaver {
    labels: Vec<String>,
    pulls: FuturesUnordered<BoxFuture<'static, PullResult>>,
    ready: VecDeque<(usize, GatewayChunk)>,
}

impl StreamInterleaver {
    /// Build an interleaver over `(agent_id, stream)` sources.
    pub fn new(sources: Vec<(String, ChunkStream)>) -> Self {
        let pulls = FuturesUnordered::new();
        let mut labels = Vec::with_capacity(sources.len());
        for (idx, (label, stream)) in sources.into_iter().enumerate() {
            labels.push(label);
            pulls.push(Self::pull(idx, stream));
        }
        Self {
            labels,
            pulls,
            ready: VecDeque::new(),
        }
    }

    fn pull(idx: usize, mut stream: ChunkStream) -> BoxFuture<'static, PullResult> {
        async move {
            let item = stream.next().await;
            (idx, item, stream)
        }
        .boxed()
    }

    /// Next interleaved chunk, tagged with its source agent id. `None` once
    /// every source is exhausted.
    pub async fn next(&mut self) -> Option<(String, GatewayChunk)> {
        loop {
            if let Some((idx, chunk)) = self.ready.pop_front() {
                return Some((self.labels[idx].clone(), chunk));
            }
            if self.pulls.is_empty() {
                return None;
            }

            // Wait until at least one in-flight pull resolves, then collect
            // every sibling that resolved in the same tick.
            let first = match self.pulls.next().await {
                Some(result) => result,
                None => return None,
            };
            let mut resolved = vec![first];
            while let Some(Some(result)) = self.pulls.next().now_or_never() {
                resolved.push(result);
            }

            for (idx, item, stream) in resolved {
                match item {
                    Some(chunk) => {
                        self.ready.push_back((idx, chunk));
                        self.pulls.push(Self::pull(idx, stream));
                    }
                    // Exhausted source leaves the active set.
                    None => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::collections::HashMap;

    fn text_chunk(content: &str) -> GatewayChunk {
        GatewayChunk::Text {
            content: content.to_string(),
        }
    }

    fn source(label: &str, contents: &[&str]) -> (String, ChunkStream) {
        let chunks: Vec<GatewayChunk> = contents.iter().map(|c| text_chunk(c)).collect();
        (label.to_string(), Box::pin(stream::iter(chunks)))
    }

    async fn collect(mut interleaver: StreamInterleaver) -> Vec<(String, String)> {
        let mut out = Vec::new();
        while let Some((label, chunk)) = interleaver.next().await {
            if let GatewayChunk::Text { content } = chunk {
                out.push((label, content));
            }
        }
        out
    }

    #[tokio::test]
    async fn emits_every_chunk_exactly_once() {
        // Both sources are ready on every poll, so their pulls resolve in
        // the same tick; the drain pass must keep both.
        let interleaver = StreamInterleaver::new(vec![
            source("a", &["a1", "a2", "a3"]),
            source("b", &["b1", "b2"]),
        ]);
        let out = collect(interleaver).await;

        let mut per_source: HashMap<String, Vec<String>> = HashMap::new();
        for (label, content) in out {
            per_source.entry(label).or_default().push(content);
        }
        assert_eq!(per_source["a"], vec!["a1", "a2", "a3"]);
        assert_eq!(per_source["b"], vec!["b1", "b2"]);
    }

    #[tokio::test]
    async fn preserves_per_source_order_under_staggered_timing() {
        let slow: ChunkStream = Box::pin(
            stream::iter(vec![
                (5u64, "s1"),
                (1u64, "s2"),
                (3u64, "s3"),
            ])
            .then(|(delay, content)| async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                text_chunk(content)
            }),
        );
        let fast: ChunkStream = Box::pin(
            stream::iter(vec!["f1", "f2", "f3", "f4"]).map(|c| text_chunk(c)),
        );

        let interleaver =
            StreamInterleaver::new(vec![("slow".to_string(), slow), ("fast".to_string(), fast)]);
        let out = collect(interleaver).await;

        let slow_seq: Vec<&str> = out
            .iter()
            .filter(|(l, _)| l == "slow")
            .map(|(_, c)| c.as_str())
            .collect();
        let fast_seq: Vec<&str> = out
            .iter()
            .filter(|(l, _)| l == "fast")
            .map(|(_, c)| c.as_str())
            .collect();
        assert_eq!(slow_seq, vec!["s1", "s2", "s3"]);
        assert_eq!(fast_seq, vec!["f1", "f2", "f3", "f4"]);
        assert_eq!(out.len(), 7);
    }

    #[tokio::test]
    async fn empty_source_set_terminates_immediately() {
        let mut interleaver = StreamInterleaver::new(Vec::new());
        assert!(interleaver.next().await.is_none());
    }

    #[tokio::test]
    async fn single_source_passthrough() {
        let interleaver = StreamInterleaver::new(vec![source("only", &["x", "y"])]);
        let out = collect(interleaver).await;
        assert_eq!(
            out,
            vec![
                ("only".to_string(), "x".to_string()),
                ("only".to_string(), "y".to_string())
            ]
        );
    }
}
