//! Re-chunks streamed text so the widget renders it at an even pace.
//!
//! Provider deltas arrive in bursts of arbitrary size. Text is buffered and
//! released one word (or line) at a time with a fixed delay in between. Any
//! non-text event flushes the buffer first so ordering is preserved.

use super::events::StreamEvent;
use crate::config::{Chunking, StreamConfig};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Forwards `input` to `output`, smoothing text deltas. Returns when either side closes.
pub async fn smooth_stream(
    mut input: UnboundedReceiver<StreamEvent>,
    output: UnboundedSender<StreamEvent>,
    config: StreamConfig,
) {
    let delay = Duration::from_millis(config.delay_ms);
    let mut pending: Option<(String, String)> = None;

    while let Some(event) = input.recv().await {
        match event {
            StreamEvent::TextDelta { id, delta } if config.chunking != Chunking::None => {
                if let Some((pending_id, buffer)) = pending.take() {
                    if pending_id == id {
                        pending = Some((id.clone(), buffer));
                    } else if !flush(&output, pending_id, buffer) {
                        return;
                    }
                }

                let (_, buffer) = pending.get_or_insert_with(|| (id.clone(), String::new()));
                buffer.push_str(&delta);

                while let Some(end) = next_chunk(buffer, config.chunking) {
                    let chunk: String = buffer.drain(..end).collect();
                    let event = StreamEvent::TextDelta {
                        id: id.clone(),
                        delta: chunk,
                    };
                    if output.send(event).is_err() {
                        return;
                    }
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
            other => {
                if let Some((id, buffer)) = pending.take() {
                    if !flush(&output, id, buffer) {
                        return;
                    }
                }
                if output.send(other).is_err() {
                    return;
                }
            }
        }
    }

    if let Some((id, buffer)) = pending.take() {
        flush(&output, id, buffer);
    }
}

/// Sends buffered text as one delta. Returns false once the receiver is gone.
fn flush(output: &UnboundedSender<StreamEvent>, id: String, buffer: String) -> bool {
    if buffer.is_empty() {
        return true;
    }
    output
        .send(StreamEvent::TextDelta { id, delta: buffer })
        .is_ok()
}

/// Byte length of the next releasable chunk at the start of `buffer`.
///
/// Word: leading whitespace, a word and the whitespace run after it.
/// Line: everything through the next run of newlines.
pub(crate) fn next_chunk(buffer: &str, chunking: Chunking) -> Option<usize> {
    match chunking {
        Chunking::Word => {
            let word_start = buffer.find(|c: char| !c.is_whitespace())?;
            let gap_start = word_start + buffer[word_start..].find(char::is_whitespace)?;
            let gap_len = buffer[gap_start..]
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(buffer.len() - gap_start);
            Some(gap_start + gap_len)
        }
        Chunking::Line => {
            let newline = buffer.find('\n')?;
            let run = buffer[newline..]
                .find(|c: char| c != '\n')
                .unwrap_or(buffer.len() - newline);
            Some(newline + run)
        }
        Chunking::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn delta(id: &str, text: &str) -> StreamEvent {
        StreamEvent::TextDelta {
            id: id.into(),
            delta: text.into(),
        }
    }

    async fn run(events: Vec<StreamEvent>, chunking: Chunking) -> Vec<StreamEvent> {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        for event in events {
            in_tx.send(event).unwrap();
        }
        drop(in_tx);

        let config = StreamConfig {
            delay_ms: 0,
            chunking,
        };
        smooth_stream(in_rx, out_tx, config).await;

        let mut out = Vec::new();
        while let Some(event) = out_rx.recv().await {
            out.push(event);
        }
        out
    }

    #[test]
    fn word_chunk_boundaries() {
        assert_eq!(next_chunk("Hello world", Chunking::Word), Some(6));
        assert_eq!(next_chunk("  Hi  there", Chunking::Word), Some(6));
        assert_eq!(next_chunk("Hello", Chunking::Word), None);
        assert_eq!(next_chunk("   ", Chunking::Word), None);
        assert_eq!(next_chunk("naïve café", Chunking::Word), Some("naïve ".len()));
    }

    #[test]
    fn line_chunk_boundaries() {
        assert_eq!(next_chunk("a\n\nb", Chunking::Line), Some(3));
        assert_eq!(next_chunk("abc", Chunking::Line), None);
    }

    #[tokio::test]
    async fn splits_deltas_into_words() {
        let out = run(
            vec![
                StreamEvent::TextStart { id: "t".into() },
                delta("t", "Our return win"),
                delta("t", "dow is 30 days."),
                StreamEvent::TextEnd { id: "t".into() },
            ],
            Chunking::Word,
        )
        .await;

        assert_eq!(
            out,
            vec![
                StreamEvent::TextStart { id: "t".into() },
                delta("t", "Our "),
                delta("t", "return "),
                delta("t", "window "),
                delta("t", "is "),
                delta("t", "30 "),
                delta("t", "days."),
                StreamEvent::TextEnd { id: "t".into() },
            ]
        );
    }

    #[tokio::test]
    async fn flushes_on_close_and_text_id_change() {
        let out = run(vec![delta("a", "one"), delta("b", "two")], Chunking::Word).await;
        assert_eq!(out, vec![delta("a", "one"), delta("b", "two")]);
    }

    #[tokio::test]
    async fn passthrough_without_chunking() {
        let out = run(vec![delta("a", "one two")], Chunking::None).await;
        assert_eq!(out, vec![delta("a", "one two")]);
    }
}
