use crate::error::BrowserError;
use async_trait::async_trait;

/// Browser operations the page collector needs from a flipbook viewer
#[async_trait]
pub trait Viewer: Send {
    /// `src` attribute of every element matching `selector`, in document
    /// order. Elements without the attribute yield `None`.
    async fn image_sources(&mut self, selector: &str) -> Result<Vec<Option<String>>, BrowserError>;

    /// Number of elements matching `selector`
    async fn count(&mut self, selector: &str) -> Result<usize, BrowserError>;

    /// Click the first element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;

    /// Press the "next page" arrow key on the focused element
    async fn press_next_key(&mut self) -> Result<(), BrowserError>;
}

/// How the viewer is moved to the next page in a given round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Click the viewer's "next" control
    ExplicitControl,
    /// No "next" control on the page; press the arrow key instead
    KeyFallback,
}

impl Advance {
    /// Pick the advance action based on whether `next_selector` matches anything
    pub async fn select<V: Viewer + ?Sized>(
        viewer: &mut V,
        next_selector: &str,
    ) -> Result<Self, BrowserError> {
        if viewer.count(next_selector).await? > 0 {
            Ok(Advance::ExplicitControl)
        } else {
            Ok(Advance::KeyFallback)
        }
    }

    pub async fn perform<V: Viewer + ?Sized>(
        self,
        viewer: &mut V,
        next_selector: &str,
    ) -> Result<(), BrowserError> {
        match self {
            Advance::ExplicitControl => {
                ::log::info!("Clicking next control ({})", next_selector);
                viewer.click(next_selector).await
            }
            Advance::KeyFallback => {
                ::log::warn!("No next control matched {}, pressing ArrowRight", next_selector);
                viewer.press_next_key().await
            }
        }
    }
}
