//! Output file handling with [`OutputFile`].
//!
//! This abstracts writing both plaintext and gzip-compressed output.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

enum OutputDestination {
    File(PathBuf),
    Stdout,
}

/// Represents an output file.
///
/// A path with a `.gz` extension is written gzip-compressed.
pub struct OutputFile {
    destination: OutputDestination,
    pub header: Option<Vec<String>>,
}

impl OutputFile {
    /// Constructs a new `OutputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - the path of the file to write.
    /// * `header` - optional comment lines written, prefixed with `#`, before anything else.
    pub fn new(filepath: impl Into<PathBuf>, header: Option<Vec<String>>) -> Self {
        Self {
            destination: OutputDestination::File(filepath.into()),
            header,
        }
    }

    /// Constructs a new [`OutputFile`] for standard output.
    pub fn new_stdout(header: Option<Vec<String>>) -> Self {
        Self {
            destination: OutputDestination::Stdout,
            header,
        }
    }

    /// Whether output goes through gzip compression.
    pub fn is_gzipped(&self) -> bool {
        match &self.destination {
            OutputDestination::File(path) => path
                .extension()
                .map_or(false, |extension| extension == "gz"),
            OutputDestination::Stdout => false,
        }
    }

    /// Opens the destination and returns a writer, with the header already
    /// written if one is set.
    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        let mut writer: Box<dyn Write> = match &self.destination {
            OutputDestination::File(path) => {
                if self.is_gzipped() {
                    Box::new(BufWriter::new(GzEncoder::new(
                        File::create(path)?,
                        Compression::default(),
                    )))
                } else {
                    Box::new(BufWriter::new(File::create(path)?))
                }
            }
            OutputDestination::Stdout => Box::new(BufWriter::new(io::stdout())),
        };
        if let Some(entries) = &self.header {
            for entry in entries {
                writeln!(writer, "#{}", entry)?;
            }
        }
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_plain_output_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("window.tsv");
        let output = OutputFile::new(&path, Some(vec!["chrom=1".to_string()]));
        assert!(!output.is_gzipped());
        {
            let mut writer = output.writer().unwrap();
            writeln!(writer, "A\t0\t1").unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "#chrom=1\nA\t0\t1\n");
    }

    #[test]
    fn test_gzip_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("window.tsv.gz");
        let output = OutputFile::new(&path, None);
        assert!(output.is_gzipped());
        {
            let mut writer = output.writer().unwrap();
            writeln!(writer, "B\t2").unwrap();
        }
        let mut decoded = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "B\t2\n");
    }
}
