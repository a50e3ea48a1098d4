use crate::browser::page::{PageError, PortalPage};

use super::log::RunLog;
use super::score::max_by_score;
use super::selectors::EdisSelectors;

/// Where the load-curve content lives after selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameChoice {
    Top,
    Frame { index: u16, score: i32 },
}

/// URL part of a frame's score: +2 for the load-curve route, -2 for
/// chat/assistant widget frames.
pub fn score_frame_url(url: &str) -> i32 {
    let lower = url.to_lowercase();
    let mut score = 0;
    if lower.contains(EdisSelectors::LOAD_CURVE_ROUTE) {
        score += 2;
    }
    if EdisSelectors::FRAME_URL_PENALTIES
        .iter()
        .any(|marker| lower.contains(marker))
    {
        score -= 2;
    }
    score
}

/// Text part of a frame's score: +1 when the visible text carries a known
/// section label.
pub fn score_frame_text(text: &str) -> i32 {
    let lower = text.to_lowercase();
    if EdisSelectors::FRAME_TEXT_LABELS
        .iter()
        .any(|label| lower.contains(label))
    {
        1
    } else {
        0
    }
}

/// Scores the top document and every iframe; enters the best frame when it
/// beats the top document. Ties keep the earliest frame.
pub async fn select_content_frame(
    page: &dyn PortalPage,
    log: &mut RunLog,
) -> Result<FrameChoice, PageError> {
    let frames = page.frames().await?;
    if frames.is_empty() {
        log.push("frames: none found, staying on top document");
        return Ok(FrameChoice::Top);
    }

    let mut scored = Vec::with_capacity(frames.len());
    for frame in frames {
        let mut score = score_frame_url(&frame.url);
        if page.enter_frame(frame.index).await.is_ok() {
            let text = page.body_text().await.unwrap_or_default();
            score += score_frame_text(&text);
            page.enter_top().await?;
        }
        log.push(format!(
            "frames: candidate index={} url='{}' score={}",
            frame.index, frame.url, score
        ));
        scored.push((frame, score));
    }

    let top_text = page.body_text().await.unwrap_or_default();
    let top_score = score_frame_text(&top_text);

    match max_by_score(&scored, |(_, s)| *s) {
        Some((idx, best)) if best > 0 && best > top_score => {
            let (frame, _) = &scored[idx];
            page.enter_frame(frame.index).await?;
            log.push(format!(
                "frames: entered index={} url='{}' score={}",
                frame.index, frame.url, best
            ));
            Ok(FrameChoice::Frame {
                index: frame.index,
                score: best,
            })
        }
        _ => {
            log.push(format!("frames: top document wins (score={})", top_score));
            Ok(FrameChoice::Top)
        }
    }
}
