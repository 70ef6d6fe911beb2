use crate::app::{App, AppMode, PopupItem};

impl App {
    pub fn open_research(&mut self) {
        self.mode = AppMode::Research;
    }

    pub fn open_popup(&mut self) {
        self.mode = AppMode::Popup;
    }

    pub fn next_popup_item(&mut self) {
        self.popup_index = (self.popup_index + 1) % PopupItem::ALL.len();
    }

    pub fn previous_popup_item(&mut self) {
        self.popup_index = self
            .popup_index
            .checked_sub(1)
            .unwrap_or(PopupItem::ALL.len() - 1);
    }

    #[must_use]
    pub fn selected_popup_item(&self) -> Option<PopupItem> {
        PopupItem::ALL.get(self.popup_index).copied()
    }

    pub fn execute_popup_item(&mut self) {
        match self.selected_popup_item() {
            Some(PopupItem::OpenResearchHub) => self.open_research(),
            Some(PopupItem::ResetNotes) => self.reset_notes(),
            Some(PopupItem::Quit) => self.should_quit = true,
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::*;
    use crate::types::Note;

    #[tokio::test]
    async fn test_reset_entry_empties_collection() {
        let mut t = detached_app(vec![Note::raw("A"), Note::summary("B")]).await;
        t.app.open_popup();
        t.app.next_popup_item();
        assert_eq!(t.app.selected_popup_item(), Some(PopupItem::ResetNotes));

        t.app.execute_popup_item();
        settle(&mut t.app, |app| app.notes.is_empty()).await;
        assert!(t.store.load_all().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn test_popup_navigation_wraps() {
        let mut t = detached_app(Vec::new()).await;
        t.app.previous_popup_item();
        assert_eq!(t.app.selected_popup_item(), Some(PopupItem::Quit));
        t.app.execute_popup_item();
        assert!(t.app.should_quit);
    }
}
