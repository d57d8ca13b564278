use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default audio file extensions picked up by a directory import
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac", "opus", "wma",
];

/// Scanner for finding audio files in a directory tree
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Scan a directory recursively and return the audio file paths,
    /// sorted so imports get ids in a predictable order
    pub fn scan<P: AsRef<Path>>(
        directory: P,
        extensions: &[String],
    ) -> Result<Vec<PathBuf>, anyhow::Error> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            anyhow::bail!("{:?} is not a directory", directory);
        }

        let mut audio_files = Vec::new();

        for entry in WalkDir::new(directory)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            if Self::has_supported_extension(path, extensions) {
                audio_files.push(path.to_path_buf());
            }
        }

        Ok(audio_files)
    }

    fn has_supported_extension(path: &Path, extensions: &[String]) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }
}
