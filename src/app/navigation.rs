/// Cursor movement shared by the launcher list and the notes list
pub trait Navigable {
    fn get_item_count(&self) -> usize;

    fn get_selected_index(&self) -> usize;

    fn set_selected_index(&mut self, index: usize);

    /// Moves to the next item, wrapping to the start
    fn next_item(&mut self) {
        let count = self.get_item_count();
        if count > 0 {
            let next = (self.get_selected_index() + 1) % count;
            self.set_selected_index(next);
        }
    }

    /// Moves to the previous item, wrapping to the end
    fn previous_item(&mut self) {
        let count = self.get_item_count();
        if count > 0 {
            let prev = if self.get_selected_index() == 0 {
                count - 1
            } else {
                self.get_selected_index() - 1
            };
            self.set_selected_index(prev);
        }
    }

    /// Pulls the cursor back inside the list after it shrinks
    fn clamp_selected_index(&mut self) {
        let count = self.get_item_count();
        if self.get_selected_index() >= count {
            self.set_selected_index(count.saturating_sub(1));
        }
    }
}
