use indicatif::{ProgressBar, ProgressStyle};

/// Bar when the length is known, spinner otherwise.
pub fn progress_bar(len: Option<u64>, label: &'static str) -> ProgressBar {
    let pb = match len {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(bar_style());
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} [{elapsed_precise}] {pos}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    };
    pb.set_message(label);
    pb
}

/// Switch a spinner to a bar once its length becomes known.
pub fn set_known_length(pb: &ProgressBar, len: u64) {
    pb.set_length(len);
    pb.set_style(bar_style());
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}
