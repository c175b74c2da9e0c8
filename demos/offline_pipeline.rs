//! Offline Question Answering
//!
//! The whole pipeline without a network: a toy letter-frequency embedder,
//! an ephemeral index, and a chat service that echoes its best context.
//!
//! ```bash
//! cargo run --example offline_pipeline
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use ragslab::{
    ChatService, DistanceMetric, Document, Embedding, EmbeddingService, LocalIndex, Message,
    Pipeline, Result, SeparatorChunker, Session, Turn,
};

/// 26 dimensions, one per ASCII letter.
struct LetterEmbedder;

#[async_trait]
impl EmbeddingService for LetterEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.01f32; 26];
                for b in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                    v[usize::from(b - b'a')] += 1.0;
                }
                v
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "letters"
    }
}

/// Replies with the first line of retrieved context.
struct EchoChat;

#[async_trait]
impl ChatService for EchoChat {
    async fn complete(&self, messages: &[Message], _temperature: f32) -> Result<String> {
        let prompt = messages.first().map_or("", |m| m.content.as_str());
        let context = prompt
            .split("Context:\n")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap_or("I don't know.");
        Ok(context.to_string())
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let documents = vec![
        Document::new(
            "spacex.txt",
            "SpaceX builds reusable rockets.\n\nStarship is its largest vehicle.",
        ),
        Document::new(
            "apple.txt",
            "Apple sells phones and laptops.\n\nIts headquarters is in Cupertino.",
        ),
    ];

    let pipeline = Pipeline::new(
        Arc::new(SeparatorChunker::paragraphs(40, 0)?),
        Arc::new(LetterEmbedder),
        Arc::new(LocalIndex::ephemeral(DistanceMetric::Cosine)),
    )
    .with_chat(Arc::new(EchoChat));

    let report = pipeline.ingest(&documents).await?;
    println!("Indexed {} chunks from {} documents\n", report.chunks, report.documents);

    for hit in pipeline.retrieve("reusable rockets", 2).await? {
        println!("{:.3}  {:<16} {}", hit.distance, hit.id, hit.text);
    }

    let mut session = Session::new(pipeline, 10);
    for line in ["Where is Apple based?", "", "exit"] {
        match session.handle(line).await? {
            Turn::Answer(answer) => println!("\nQ: {line}\nA: {}", answer.text),
            Turn::Skip => println!("\n(skipped blank input)"),
            Turn::Exit => println!("\nSession closed"),
        }
    }

    Ok(())
}
