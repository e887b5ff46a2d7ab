//! Change-feed tap.
//!
//! Reads newline-delimited JSON rows from a file or stdin and hands each
//! one to a spawned pipeline task. Rows are independent, so a slow
//! external lookup on one row never blocks the next.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{error, info, warn};

use relay_dispatch::Messenger;
use relay_index::SubscriptionStore;
use relay_pipeline::{EventPipeline, ListRegistry, NameDirectory};
use relay_types::FeedRow;

/// Parse one feed line. Blank lines and malformed rows yield `None`;
/// malformed rows are logged.
pub fn parse_feed_line(line: &str) -> Option<FeedRow> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(row) => Some(row),
        Err(e) => {
            warn!(error = %e, "Skipping malformed feed line");
            None
        }
    }
}

/// Consume the feed until EOF or shutdown, spawning one task per row.
pub async fn consume_feed<R, S, G, N, M>(
    reader: R,
    pipeline: Arc<EventPipeline<S, G, N, M>>,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncBufRead + Unpin,
    S: SubscriptionStore + 'static,
    G: ListRegistry + 'static,
    N: NameDirectory + 'static,
    M: Messenger + 'static,
{
    let mut lines = reader.lines();
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Feed loop stopping on shutdown signal");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(row) = parse_feed_line(&line) else { continue };
                    let pipeline = Arc::clone(&pipeline);
                    tokio::spawn(async move {
                        if let Err(e) = pipeline.handle_row(&row).await {
                            error!(error = %e, "Row aborted");
                        }
                    });
                }
                Ok(None) => {
                    info!("Feed reached EOF");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Feed read failed");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::U256;

    #[test]
    fn test_parse_line_with_decimal_slot() {
        let line = r#"{"event_name":"ListOp","event_args":{"slot":"99","op":"0x01"},"chain_id":8453,"contract_address":"0x41aa48ef3c0446b46a5b1cc6337ff3d3716e2a33"}"#;
        let row = parse_feed_line(line).unwrap();
        assert_eq!(row.event_args.slot, U256::from(99u64));
    }

    #[test]
    fn test_parse_line_with_hex_slot() {
        let line = r#"{"event_name":"ListOp","event_args":{"slot":"0x63","op":"0x01"},"chain_id":"10","contract_address":"0x41aa48ef3c0446b46a5b1cc6337ff3d3716e2a33"}"#;
        let row = parse_feed_line(line).unwrap();
        assert_eq!(row.event_args.slot, U256::from(99u64));
        assert_eq!(row.chain_id, 10);
    }

    #[test]
    fn test_blank_and_malformed_lines_are_skipped() {
        assert!(parse_feed_line("").is_none());
        assert!(parse_feed_line("   ").is_none());
        assert!(parse_feed_line("{not json").is_none());
        assert!(parse_feed_line(r#"{"event_name":"ListOp"}"#).is_none());
    }
}
