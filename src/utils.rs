use indicatif::ProgressBar;

pub fn create_progress_bar(show: bool, len: usize) -> ProgressBar {
    if show {
        ProgressBar::new(len as u64)
    } else {
        ProgressBar::hidden()
    }
}
