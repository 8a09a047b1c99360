use arboard::Clipboard;

pub trait ClipboardSource: Send {
    fn read_text(&mut self) -> Result<String, String>;
    fn write_text(&mut self, text: &str) -> Result<(), String>;
}

/// The OS clipboard. A fresh handle per call; holding one open blocks
/// other apps on some platforms.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardSource for SystemClipboard {
    fn read_text(&mut self) -> Result<String, String> {
        let mut clipboard = Clipboard::new().map_err(|e| e.to_string())?;
        match clipboard.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), String> {
        let mut clipboard = Clipboard::new().map_err(|e| e.to_string())?;
        clipboard.set_text(text.to_string()).map_err(|e| e.to_string())
    }
}
