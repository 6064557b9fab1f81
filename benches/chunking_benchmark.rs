/// Benchmarks for repository chunking and splitting throughput
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use codebase_index::indexer::{ChunkPipeline, FileWalker, TokenSplitter, counter_for};
use std::path::PathBuf;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Helper to create a mixed Python / Markdown tree
fn create_test_files(dir: &TempDir, count: usize) -> anyhow::Result<()> {
    let src_dir = dir.path().join("src");
    let docs_dir = dir.path().join("docs");
    std::fs::create_dir_all(&src_dir)?;
    std::fs::create_dir_all(&docs_dir)?;

    for i in 0..count {
        let content = format!(
            r#"
def function_{i}(x):
    """Multiply by a constant."""
    return x * {}


class Data{i}:
    def __init__(self, value):
        self.value = value
        self.name = "data_{{}}".format(value)

    def process(self):
        return self.value * 2
"#,
            i + 1
        );
        std::fs::write(src_dir.join(format!("module_{}.py", i)), content)?;

        let prose = (0..600)
            .map(|w| format!("word{}_{}", i, w))
            .collect::<Vec<_>>()
            .join(" ");
        std::fs::write(docs_dir.join(format!("page_{}.md", i)), prose)?;
    }

    Ok(())
}

fn pipeline(workers: usize) -> ChunkPipeline {
    let counter = counter_for("cl100k").unwrap();
    let splitter = TokenSplitter::new(counter, 500, 50).unwrap();
    ChunkPipeline::new(splitter, workers)
}

fn benchmark_pipeline_workers(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    create_test_files(&dir, 100).unwrap();
    let walker = FileWalker::new(dir.path(), ["py", "md"]);
    let root = walker.resolve_root().unwrap();
    let files: Vec<PathBuf> = walker.walk().unwrap();
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("chunk_pipeline");
    for workers in [1, 2, 4, 8] {
        let pipeline = pipeline(workers);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_workers", workers)),
            &workers,
            |b, _| {
                b.iter(|| {
                    let run = pipeline.run(&root, &files, &cancel).unwrap();
                    black_box(run.chunks.len())
                });
            },
        );
    }
    group.finish();
}

fn benchmark_splitter(c: &mut Criterion) {
    let text = (0..5_000)
        .map(|w| format!("token{}", w))
        .collect::<Vec<_>>()
        .join(" ");

    let mut group = c.benchmark_group("token_splitter");
    for tokenizer in ["whitespace", "cl100k"] {
        let splitter = TokenSplitter::new(counter_for(tokenizer).unwrap(), 500, 50).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(tokenizer),
            &text,
            |b, text| {
                b.iter(|| black_box(splitter.split(black_box(text)).len()));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_pipeline_workers, benchmark_splitter);
criterion_main!(benches);
