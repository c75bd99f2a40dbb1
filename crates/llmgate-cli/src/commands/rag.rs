//! RAG commands

use crate::app::{OutputFormat, RagAction, RagArgs};
use anyhow::{Context, Result};
use llmgate_core::Orchestrator;

pub async fn run(args: RagArgs, gate: &Orchestrator, user: i64, format: OutputFormat) -> Result<()> {
    match args.action {
        RagAction::Add { path, title, source } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let title = title.unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "untitled".to_string())
            });

            let doc_id = gate
                .add_document(user, &title, &content, source.as_deref(), None)
                .await?;
            println!("Added document {doc_id} ({title})");
            Ok(())
        }
        RagAction::Search { query, top_k } => {
            let query = query.join(" ");
            let hits = gate.search_documents(user, &query, top_k).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hits)?),
                OutputFormat::Cli => {
                    if hits.is_empty() {
                        println!("No matching chunks.");
                    }
                    for hit in hits {
                        println!(
                            "[{:.3}] {} (doc {}, chunk {})",
                            hit.score, hit.title, hit.document_id, hit.chunk_id
                        );
                        println!("  {}", preview(&hit.content, 200));
                    }
                }
            }
            Ok(())
        }
        RagAction::Ask { query, model, top_k } => {
            let query = query.join(" ");
            let answer = gate.ask(user, &query, model.as_deref(), top_k).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&answer)?),
                OutputFormat::Cli => {
                    println!("{}", answer.text);
                    if !answer.sources.is_empty() {
                        eprintln!();
                        for (i, source) in answer.sources.iter().enumerate() {
                            eprintln!("Source {}: {} (doc {})", i + 1, source.title, source.document_id);
                        }
                    }
                }
            }
            Ok(())
        }
        RagAction::Ls => {
            let docs = gate.list_documents(user)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&docs)?),
                OutputFormat::Cli => {
                    if docs.is_empty() {
                        println!("No documents.");
                    }
                    for doc in docs {
                        println!(
                            "{:>5}  {}  ({} chunks{})",
                            doc.id,
                            doc.title,
                            doc.chunk_count,
                            doc.source
                                .map(|s| format!(", from {s}"))
                                .unwrap_or_default(),
                        );
                    }
                }
            }
            Ok(())
        }
        RagAction::Remove { document_id } => {
            gate.delete_document(user, document_id).await?;
            println!("Removed document {document_id}");
            Ok(())
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
