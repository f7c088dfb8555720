//! Share link generation.
//!
//! Derives the canonical shareable URL for a public task id. Pure: no
//! network or store access. Writing the link to a clipboard is an external
//! capability behind the `Clipboard` trait.

use crate::error::Result;
use crate::store::DocId;

/// Build the canonical share link: `{base_url}/task/{id}`.
pub fn share_link(base_url: &str, id: &DocId) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/task/{id}")
}

/// External clipboard capability.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Clipboard that discards writes; the CLI prints the link instead.
#[derive(Debug, Default)]
pub struct NullClipboard;

impl Clipboard for NullClipboard {
    fn write_text(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}
