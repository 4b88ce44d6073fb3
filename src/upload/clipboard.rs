//! System clipboard access.

use crate::GgifError;

/// Destination for published URLs.
pub trait Clipboard: Send {
    fn set_text(&mut self, text: &str) -> Result<(), GgifError>;
}

/// Clipboard backed by `arboard`.
///
/// A fresh handle is opened per write; on X11 and Wayland, arboard hands the
/// contents to the clipboard manager when the last handle drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), GgifError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|err| GgifError::Clipboard(err.to_string()))?;
        clipboard
            .set_text(text.to_owned())
            .map_err(|err| GgifError::Clipboard(err.to_string()))
    }
}
