use std::io::{self, Write};

use workbench_core::{AppViewModel, EntryView, Origin};

/// Prints chat entries as they appear or change.
pub struct Renderer<W: Write> {
    out: W,
    shown: Vec<EntryView>,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: Vec::new(),
        }
    }

    /// Treats the entries of `view` as already shown.
    pub fn mark_shown(&mut self, view: &AppViewModel) {
        self.shown = view.entries.clone();
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        if view.entries.len() < self.shown.len() {
            writeln!(self.out, "-- history cleared --")?;
            self.shown.clear();
        }
        for (index, row) in view.entries.iter().enumerate() {
            if self.shown.get(index) != Some(row) {
                writeln!(self.out, "{}", format_entry(row))?;
            }
        }
        self.shown = view.entries.clone();
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

pub fn format_entry(row: &EntryView) -> String {
    let text = row.text.as_deref().unwrap_or_default();
    match row.origin {
        Origin::User => format!("you> {text}"),
        Origin::Assistant if row.pending => {
            let task = row.task_id.as_deref().unwrap_or("?");
            format!("bot> generating image... (task {task})")
        }
        Origin::Assistant if !text.is_empty() => format!("bot> {text}"),
        Origin::Assistant => {
            let caption = row.caption.as_deref().unwrap_or("result");
            if row.result_urls.is_empty() {
                return format!("bot> {caption}: no images returned");
            }
            let mut lines = vec![format!("bot> {caption}")];
            lines.extend(
                row.result_urls
                    .iter()
                    .enumerate()
                    .map(|(i, url)| format!("     {}. {url}", i + 1)),
            );
            lines.join("\n")
        }
    }
}
