//! Indexes the essays under `data/paul_graham` and asks a question about
//! them.
//!
//! Needs `OPENAI_API_KEY`.

use std::path::PathBuf;
use std::sync::Arc;

use stepflow::llm::{LlmConfig, OpenAiClient};
use stepflow::observability::init_tracing;
use stepflow::retrieval::{DirectoryReader, OpenAiEmbedder, RetrievalSettings, VectorStoreIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false);

    let settings = RetrievalSettings::new()
        .with_chunk_size(1024)
        .with_chunk_overlap(128)
        .with_embedding_model("text-embedding-3-small");

    let config = LlmConfig::from_env()?.with_embedding_model(settings.embedding_model.clone());
    let client = OpenAiClient::new(config)?;

    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("data")
        .join("paul_graham");
    let documents = DirectoryReader::new(data_dir).load_data().await?;

    let embedder = Arc::new(OpenAiEmbedder::new(client.clone()));
    let index = VectorStoreIndex::from_documents(&documents, embedder, &settings).await?;

    let response = index
        .as_query_engine(Arc::new(client))
        .query("What did the author do growing up?")
        .await?;
    println!("{response}");
    Ok(())
}
