pub mod align;
pub mod linguistic;
pub mod merge;
pub mod presplit;
pub mod semantic;

pub use align::align_with_tokens;
pub use merge::{MergeThresholds, validate_and_merge};
pub use presplit::presplit_by_silence;

use tracing::{debug, info, warn};

use lauscher_config::AppConfig;

use crate::nlp::{Annotator, NlpError};
use crate::{Segment, TokenTiming};

/// Appended to every refined segment end so playback does not clip the last
/// word. May overlap the next segment's start; consumers clamp on read.
const TAIL_EXTENSION_SECS: f64 = 0.15;

/// Refines coarse segments into subtitle-sized pieces with aligned
/// timestamps.
///
/// Per segment: semantic (LLM) split when enabled, otherwise the rule-based
/// pass chain (sentences → commas → connectors → root DP), then timestamp
/// alignment against the segment's token timing, falling back to
/// character-proportional interpolation.
pub async fn refine_segments(
    segments: Vec<Segment>,
    config: &AppConfig,
    annotator: &dyn Annotator,
) -> Result<Vec<Segment>, NlpError> {
    info!("Starting sentence splitting over {} segments", segments.len());

    let max_len = config.app.max_split_length;
    let use_llm = config.app.use_llm;
    let joiner = AppConfig::joiner(&config.app.source_language);

    let mut refined: Vec<Segment> = Vec::new();

    for (i, segment) in segments.into_iter().enumerate() {
        let mut parts: Vec<String> = Vec::new();

        if use_llm {
            match semantic::split_text_by_meaning(&config.llm, &segment.text, max_len).await {
                Ok(pieces) => parts = pieces,
                Err(e) => {
                    warn!("LLM splitting failed for segment {i}: {e}. Falling back to rule-based splitting.");
                }
            }
        }

        if parts.is_empty() {
            parts = linguistic::split_linguistically(&segment.text, max_len, joiner, annotator)
                .await?;
        }

        let aligned = match &segment.timing {
            Some(TokenTiming { tokens, end_times }) => {
                align_with_tokens(&parts, tokens, end_times, joiner)
            }
            None => None,
        };

        match aligned {
            Some(mut pieces) => refined.append(&mut pieces),
            None => {
                debug!("No usable token timing for segment {i}, interpolating proportionally");
                refined.append(&mut align::interpolate_proportionally(
                    &parts,
                    segment.start,
                    segment.end,
                ));
            }
        }
    }

    for segment in &mut refined {
        segment.end += TAIL_EXTENSION_SECS;
    }

    info!("Sentence splitting complete: -> {} segments", refined.len());
    Ok(refined)
}
