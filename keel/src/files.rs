//! A source-file database keyed by [`FileId`] instead of `usize`.

use std::fmt;
use std::num::NonZeroU32;
use std::ops::Range;

use codespan_reporting::files::Error;

/// File id.
// - Use `u32` over `usize` because 4 billion files should be enough for anyone
// - `NonZeroU32` keeps `Option<FileId>` the size of a `u32`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FileId(NonZeroU32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u32> for FileId {
    type Error = <NonZeroU32 as TryFrom<u32>>::Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let id = NonZeroU32::try_from(value)?;
        Ok(Self(id))
    }
}

impl From<FileId> for u32 {
    fn from(value: FileId) -> Self {
        value.0.get()
    }
}

impl From<FileId> for usize {
    fn from(value: FileId) -> Self {
        value.0.get() as Self
    }
}

struct File {
    name: String,
    source: String,
    line_starts: Vec<usize>,
}

impl File {
    fn line_start(&self, line_index: usize) -> Result<usize, Error> {
        use std::cmp::Ordering;

        match line_index.cmp(&self.line_starts.len()) {
            Ordering::Less => Ok(self.line_starts[line_index]),
            Ordering::Equal => Ok(self.source.len()),
            Ordering::Greater => Err(Error::LineTooLarge {
                given: line_index,
                max: self.line_starts.len() - 1,
            }),
        }
    }
}

/// Source-file database.
pub struct Files {
    files: Vec<File>,
}

impl Files {
    /// Create a new files database.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Add a file to the database, returning the handle that can be used to
    /// refer to it again.
    pub fn add(&mut self, name: String, source: String) -> FileId {
        let line_starts = codespan_reporting::files::line_starts(&source).collect();
        self.files.push(File {
            name,
            source,
            line_starts,
        });
        let len = u32::try_from(self.files.len())
            .expect("Too many files (maximum amount of files is `u32::MAX`)");
        FileId::try_from(len).unwrap()
    }

    fn get(&self, file_id: FileId) -> Result<&File, Error> {
        let index = usize::from(file_id) - 1;
        self.files.get(index).ok_or(Error::FileMissing)
    }

    /// Get the name of a previously added file.
    pub fn name(&self, file_id: FileId) -> Result<&str, Error> {
        Ok(self.get(file_id)?.name.as_str())
    }

    /// Get the source text of a previously added file.
    pub fn source(&self, file_id: FileId) -> Result<&str, Error> {
        Ok(self.get(file_id)?.source.as_str())
    }
}

impl Default for Files {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> codespan_reporting::files::Files<'a> for Files {
    type FileId = FileId;
    type Name = &'a str;
    type Source = &'a str;

    fn name(&'a self, file_id: FileId) -> Result<&'a str, Error> {
        Ok(self.get(file_id)?.name.as_str())
    }

    fn source(&'a self, file_id: FileId) -> Result<&'a str, Error> {
        Ok(self.get(file_id)?.source.as_str())
    }

    fn line_index(&self, file_id: FileId, byte_index: usize) -> Result<usize, Error> {
        let file = self.get(file_id)?;
        Ok(file
            .line_starts
            .binary_search(&byte_index)
            .unwrap_or_else(|next_line| next_line - 1))
    }

    fn line_range(&self, file_id: FileId, line_index: usize) -> Result<Range<usize>, Error> {
        let file = self.get(file_id)?;
        let start = file.line_start(line_index)?;
        let end = file.line_start(line_index + 1)?;
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codespan_reporting::files::Files as _;

    #[test]
    fn file_ids_start_at_one() {
        let mut files = Files::new();
        let id = files.add("a.keel".to_owned(), "module A {}".to_owned());
        assert_eq!(u32::from(id), 1);
        assert_eq!(files.name(id).unwrap(), "a.keel");
    }

    #[test]
    fn line_lookup() {
        let mut files = Files::new();
        let id = files.add("a.keel".to_owned(), "one\ntwo\nthree\n".to_owned());
        assert_eq!(files.line_index(id, 0).unwrap(), 0);
        assert_eq!(files.line_index(id, 5).unwrap(), 1);
        assert_eq!(files.line_range(id, 1).unwrap(), 4..8);
    }
}
