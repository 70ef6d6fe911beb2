use arboard::Clipboard;
use color_eyre::Result;

/// Text source for captures plus the copy target for answers
pub struct ClipboardService {
    clipboard: Option<Clipboard>,
}

impl Default for ClipboardService {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardService {
    pub fn new() -> Self {
        Self {
            clipboard: Clipboard::new().ok(),
        }
    }

    pub fn copy_text(&mut self, text: &str) -> Result<()> {
        let clipboard = self.get_clipboard()?;
        clipboard.set_text(text.to_string())?;
        Ok(())
    }

    /// Currently selected text: the primary selection on Linux when it holds
    /// anything, otherwise the regular clipboard.
    pub fn read_selection(&mut self) -> Result<String> {
        let clipboard = self.get_clipboard()?;

        #[cfg(target_os = "linux")]
        {
            use arboard::{GetExtLinux, LinuxClipboardKind};
            if let Ok(text) = clipboard.get().clipboard(LinuxClipboardKind::Primary).text()
                && !text.trim().is_empty()
            {
                return Ok(text);
            }
        }

        Ok(clipboard.get_text()?)
    }

    fn get_clipboard(&mut self) -> Result<&mut Clipboard> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new()?);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| color_eyre::eyre::eyre!("Clipboard unavailable"))
    }
}
