//! Human-pacing simulation: randomized sleeps, typing, and scrolling.
//!
//! Pacing is a rate-shaping control, not a correctness requirement. All
//! delays flow through a [`Pacing`] bundle so tests can run with
//! [`Pacing::none`] and pay nothing.

use rand::Rng;
use std::time::Duration;

use crate::error::Result;
use crate::page::{Element, PageDriver};

/// Delay ranges applied between and within page interactions.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Pause while "reading" page content.
    pub reading: (Duration, Duration),
    /// Longer pause before a deliberate action.
    pub thinking: (Duration, Duration),
    /// Per-character delay while typing.
    pub typing: (Duration, Duration),
    /// Short settle after clicks that may open a modal.
    pub settle: Duration,
}

impl Pacing {
    /// Human-like defaults.
    pub fn human() -> Self {
        Self {
            reading: (Duration::from_millis(800), Duration::from_millis(2000)),
            thinking: (Duration::from_millis(1500), Duration::from_millis(3000)),
            typing: (Duration::from_millis(80), Duration::from_millis(220)),
            settle: Duration::from_millis(500),
        }
    }

    /// Zero delays, for tests.
    pub fn none() -> Self {
        Self {
            reading: (Duration::ZERO, Duration::ZERO),
            thinking: (Duration::ZERO, Duration::ZERO),
            typing: (Duration::ZERO, Duration::ZERO),
            settle: Duration::ZERO,
        }
    }

    pub async fn reading_pause(&self) {
        sleep_range(self.reading.0, self.reading.1).await;
    }

    pub async fn thinking_pause(&self) {
        sleep_range(self.thinking.0, self.thinking.1).await;
    }

    pub async fn settle(&self) {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::human()
    }
}

/// Sleep for a random duration in `[min, max]`. `min >= max` sleeps `min`.
pub async fn sleep_range(min: Duration, max: Duration) {
    let delay = sample_range(min, max);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn sample_range(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
    Duration::from_millis(millis as u64)
}

/// Type into an element with per-character pacing.
///
/// The driver performs one focused `type_text` call; the per-character delay
/// is simulated afterwards so the driver keeps a single interaction per call.
pub async fn human_type(
    page: &dyn PageDriver,
    pacing: &Pacing,
    el: Element,
    text: &str,
) -> Result<()> {
    page.click(el).await?;
    page.type_text(el, text).await?;
    if !pacing.typing.1.is_zero() {
        for _ in text.chars() {
            sleep_range(pacing.typing.0, pacing.typing.1).await;
        }
    }
    Ok(())
}

/// Small randomized scroll to simulate reading. Failures are ignored.
pub async fn random_scroll(page: &dyn PageDriver) {
    let offset = rand::thread_rng().gen_range(-150i32..=150);
    let _ = page
        .evaluate(&format!("window.scrollBy(0, {});", offset))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::FakePage;
    use crate::page::require;

    #[test]
    fn test_sample_range_degenerate() {
        let d = sample_range(Duration::from_millis(100), Duration::from_millis(100));
        assert_eq!(d, Duration::from_millis(100));
        let d = sample_range(Duration::from_millis(200), Duration::from_millis(100));
        assert_eq!(d, Duration::from_millis(200));
    }

    #[test]
    fn test_sample_range_within_bounds() {
        for _ in 0..50 {
            let d = sample_range(Duration::from_millis(10), Duration::from_millis(20));
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
    }

    #[tokio::test]
    async fn test_human_type_clicks_then_types() {
        let page = FakePage::new();
        page.node("mock://p", "#message-box", "");
        page.navigate("mock://p").await.unwrap();

        let el = require(&page, "#message-box").await.unwrap();
        human_type(&page, &Pacing::none(), el, "hello").await.unwrap();

        assert_eq!(page.clicks().len(), 1);
        let typed = page.typed();
        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].2, "hello");
    }
}
