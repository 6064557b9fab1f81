use super::{Chunk, ChunkMetadata, dedup::content_hash};
use crate::git::SourceRevision;

/// Builds [`Chunk`] records from split content.
///
/// Pure: the same inputs always produce the same chunk, and the id depends on
/// the content alone.
#[derive(Debug, Clone, Default)]
pub struct ChunkAssembler {
    revision: Option<SourceRevision>,
}

impl ChunkAssembler {
    pub fn new(revision: Option<SourceRevision>) -> Self {
        Self { revision }
    }

    /// Attach metadata to one chunk of content
    pub fn assemble(
        &self,
        content: &str,
        relative_path: &str,
        segment_index: usize,
        chunk_index: usize,
        language: &str,
    ) -> Chunk {
        let (repo_url, commit_hash) = match &self.revision {
            Some(rev) => (rev.repo_url.clone(), Some(rev.commit_hash.clone())),
            None => (None, None),
        };

        Chunk {
            id: content_hash(content),
            content: content.to_string(),
            metadata: ChunkMetadata {
                relative_path: relative_path.to_string(),
                segment_index,
                chunk_index,
                language: language.to_string(),
                repo_url,
                commit_hash,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_without_revision() {
        let assembler = ChunkAssembler::default();
        let chunk = assembler.assemble("def a(): pass", "src/a.py", 0, 1, "Python");

        assert_eq!(chunk.id, content_hash("def a(): pass"));
        assert_eq!(chunk.content, "def a(): pass");
        assert_eq!(chunk.metadata.relative_path, "src/a.py");
        assert_eq!(chunk.metadata.segment_index, 0);
        assert_eq!(chunk.metadata.chunk_index, 1);
        assert_eq!(chunk.metadata.language, "Python");
        assert!(chunk.metadata.repo_url.is_none());
        assert!(chunk.metadata.commit_hash.is_none());
    }

    #[test]
    fn test_assemble_with_revision() {
        let assembler = ChunkAssembler::new(Some(SourceRevision {
            commit_hash: "0123abcd".to_string(),
            repo_url: Some("git@example.com:org/repo.git".to_string()),
        }));
        let chunk = assembler.assemble("# Title", "README.md", 0, 0, "Markdown");

        assert_eq!(chunk.metadata.commit_hash.as_deref(), Some("0123abcd"));
        assert_eq!(
            chunk.metadata.repo_url.as_deref(),
            Some("git@example.com:org/repo.git")
        );
    }

    #[test]
    fn test_id_ignores_metadata() {
        let assembler = ChunkAssembler::default();
        let a = assembler.assemble("same", "a.md", 0, 0, "Markdown");
        let b = assembler.assemble("same", "b/c.txt", 3, 2, "Text");
        assert_eq!(a.id, b.id);
        assert_ne!(a.metadata, b.metadata);
    }
}
