use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use khgrab::{RunObserver, SongError};

/// Renders an album run as console progress: one bar counting songs, one
/// transient byte bar per download in flight.
pub struct ConsoleObserver {
    multi: MultiProgress,
    album: Mutex<Option<ProgressBar>>,
    songs: Mutex<HashMap<String, ProgressBar>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        ConsoleObserver {
            multi: MultiProgress::new(),
            album: Mutex::new(None),
            songs: Mutex::new(HashMap::new()),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = self.album.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }

    fn album_bar(&self) -> Option<ProgressBar> {
        self.album.lock().unwrap().clone()
    }
}

impl RunObserver for ConsoleObserver {
    fn album_started(&self, title: &str, songs: usize) {
        println!("Downloading {title}....");
        let bar = self.multi.add(ProgressBar::new(songs as u64));
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} files").unwrap(),
        );
        *self.album.lock().unwrap() = Some(bar);
    }

    fn song_started(&self, name: &str) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template("  {spinner} {msg} {bytes}/{total_bytes}").unwrap(),
        );
        bar.set_message(name.to_string());
        self.songs.lock().unwrap().insert(name.to_string(), bar);
    }

    fn download_progress(&self, name: &str, written: u64, total: Option<u64>) {
        if let Some(bar) = self.songs.lock().unwrap().get(name) {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.set_position(written);
        }
    }

    fn song_succeeded(&self, name: &str, path: &Path, skipped: bool) {
        if let Some(bar) = self.songs.lock().unwrap().remove(name) {
            bar.finish_and_clear();
        }
        if skipped {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let _ = self
                .multi
                .println(format!("    {file} was skipped because it already exists."));
        }
        if let Some(album) = self.album_bar() {
            album.inc(1);
        }
    }

    fn song_failed(&self, name: &str, _error: &SongError) {
        if let Some(bar) = self.songs.lock().unwrap().remove(name) {
            bar.finish_and_clear();
        }
        let _ = self.multi.println(format!("    Error: no file saved for {name}."));
        if let Some(album) = self.album_bar() {
            album.inc(1);
        }
    }
}
