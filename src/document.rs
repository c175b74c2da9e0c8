//! Documents, chunks bound to them, and loading from disk.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Chunker, Error, Result, Slab};

/// A loaded document: an identifier unique within its batch and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier, unique within a corpus. The file name when loaded from disk.
    pub id: String,
    /// Raw text content.
    pub text: String,
}

impl Document {
    /// Create a document.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Chunk this document.
    ///
    /// Only this document's text is read; chunks carry its id.
    pub fn chunks(&self, chunker: &dyn Chunker) -> Vec<Chunk> {
        chunker
            .chunk(&self.text)
            .into_iter()
            .map(|slab| Chunk::from_slab(&self.id, slab))
            .collect()
    }
}

/// A slab bound to the document it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    /// Id of the parent document.
    pub document_id: String,
    /// Zero-based position within the parent.
    pub index: usize,
    /// Character offset of the first character in the parent text.
    pub start: usize,
    /// Character offset one past the last character.
    pub end: usize,
    /// The chunk text.
    pub text: String,
}

impl Chunk {
    /// Attach a slab to a document id.
    pub fn from_slab(document_id: impl Into<String>, slab: Slab) -> Self {
        Self {
            document_id: document_id.into(),
            index: slab.index,
            start: slab.start,
            end: slab.end,
            text: slab.text,
        }
    }

    /// Corpus-wide identifier: `{document_id}_chunk{index + 1}`.
    ///
    /// ```rust
    /// use ragslab::{Chunk, Slab};
    ///
    /// let chunk = Chunk::from_slab("article.txt", Slab::new("text", 0, 4, 2));
    /// assert_eq!(chunk.id(), "article.txt_chunk3");
    /// ```
    pub fn id(&self) -> String {
        format!("{}_chunk{}", self.document_id, self.index + 1)
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Chunk every document of a corpus, in corpus order.
///
/// # Errors
///
/// Rejects corpora with a repeated document id, since chunk ids would collide.
pub fn chunk_corpus(documents: &[Document], chunker: &dyn Chunker) -> Result<Vec<Chunk>> {
    let mut seen = HashSet::with_capacity(documents.len());
    for doc in documents {
        if !seen.insert(doc.id.as_str()) {
            return Err(Error::InvalidArgument(format!(
                "duplicate document id '{}'",
                doc.id
            )));
        }
    }

    Ok(documents.iter().flat_map(|doc| doc.chunks(chunker)).collect())
}

/// Load one UTF-8 text file; the document id is its file name.
pub async fn load_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidArgument(format!("not a file path: {}", path.display())))?;

    let text = tokio::fs::read_to_string(path).await?;
    debug!(id, chars = text.chars().count(), "Loaded document");
    Ok(Document::new(id, text))
}

/// Load every `.txt` file in a directory, sorted by file name.
///
/// Symbolic links are followed; links whose target is missing are skipped.
pub async fn load_directory(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "txt") {
            continue;
        }
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Skipping dangling link");
            }
            Err(e) => return Err(e.into()),
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(load_file(&path).await?);
    }

    info!(dir = %dir.display(), count = documents.len(), "Loaded documents");
    Ok(documents)
}
