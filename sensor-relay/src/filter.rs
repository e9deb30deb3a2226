use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::SensorMessage;
use crate::error::RelayError;
use crate::transform::PayloadTransform;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    /// Lines read, blank ones included.
    pub lines: usize,
    pub failed: usize,
}

/// Transforms newline-delimited JSON messages from `input` into `output`.
///
/// Blank lines are skipped. A line that fails is written to `errors` as
/// `line <n>: <error>` and nothing is emitted for it.
pub async fn transform_lines<T, R, W, E>(
    transform: &T,
    input: R,
    output: &mut W,
    errors: &mut E,
) -> Result<FilterSummary, RelayError>
where
    T: PayloadTransform,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut summary = FilterSummary::default();

    while let Some(line) = lines.next_line().await? {
        summary.lines += 1;
        if line.trim().is_empty() {
            continue;
        }

        let derived =
            SensorMessage::from_slice(line.as_bytes()).and_then(|message| transform.apply(&message));
        match derived {
            Ok(derived) => {
                let mut out = derived.to_vec()?;
                out.push(b'\n');
                output.write_all(&out).await?;
            }
            Err(error) => {
                summary.failed += 1;
                warn!(line = summary.lines, %error, transform = transform.name(), "Line rejected");
                errors
                    .write_all(format!("line {}: {error}\n", summary.lines).as_bytes())
                    .await?;
            }
        }
    }

    output.flush().await?;
    errors.flush().await?;
    Ok(summary)
}
