//! Debounce operator for input streams.

use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::Instant;

/// Coalesce bursts of input into one value per quiet period.
///
/// Each output is the latest input seen once `delay` has passed with no
/// newer input, emitted at last-input-time + `delay`. Every call owns its
/// own timer, so two debounced streams never reset each other. When the
/// input ends, a pending value is still delivered on schedule.
pub fn debounce<S>(input: S, delay: Duration) -> impl Stream<Item = S::Item>
where
    S: Stream + Unpin,
{
    futures::stream::unfold(Some(input), move |input| async move {
        let mut input = input?;
        let mut pending = input.next().await?;
        let mut deadline = Instant::now() + delay;

        loop {
            tokio::select! {
                next = input.next() => match next {
                    Some(value) => {
                        pending = value;
                        deadline = Instant::now() + delay;
                    }
                    None => {
                        tokio::time::sleep_until(deadline).await;
                        return Some((pending, None));
                    }
                },
                () = tokio::time::sleep_until(deadline) => {
                    return Some((pending, Some(input)));
                }
            }
        }
    })
}
