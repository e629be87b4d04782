//! CLI command implementations.
//!
//! Every command opens the configured SQLite store and starts an engine
//! from it, so state written by one invocation (training data, discovered
//! clusters, promoted intents) is visible to the next.

use std::sync::Arc;

use anyhow::Result;

use crate::classifier::Classification;
use crate::config::Config;
use crate::engine::Engine;
use crate::models::TrainingData;
use crate::store::SqliteStore;

async fn open_engine(config: &Config) -> Result<Engine> {
    let store = SqliteStore::open(config).await?;
    Engine::start(config, Arc::new(store)).await
}

/// Answer one query and print the response text.
pub async fn run_ask(config: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be empty");
    }
    let engine = open_engine(config).await?;
    let answer = engine.answer(query).await;

    println!("{}", answer.text);
    match &answer.classification {
        Classification::Matched { intent, similarity } => {
            eprintln!("intent: {} ({:.3})", intent, similarity);
        }
        Classification::Unmatched { .. } => {
            eprintln!("intent: none (recorded for discovery)");
        }
    }
    Ok(())
}

/// Add a training entry and retrain.
pub async fn run_train(
    config: &Config,
    query: String,
    answer: String,
    intent: Option<String>,
) -> Result<()> {
    let engine = open_engine(config).await?;
    engine
        .train(TrainingData {
            query,
            answer,
            intent,
        })
        .await?;
    let count = engine.dataset().await.len();
    println!("Training data accepted ({} entries).", count);
    Ok(())
}

/// Print the ranked corpus keywords.
pub async fn run_keywords(config: &Config, limit: Option<usize>) -> Result<()> {
    let engine = open_engine(config).await?;
    let keywords = engine.keywords().await;
    let limit = limit.unwrap_or(keywords.len());

    if keywords.is_empty() {
        println!("No keywords.");
        return Ok(());
    }
    for (rank, keyword) in keywords.iter().take(limit).enumerate() {
        println!("{:>3}. {:<24} {:.4}", rank + 1, keyword.term, keyword.score);
    }
    Ok(())
}

/// Print active intents and pending clusters.
pub async fn run_intents(config: &Config) -> Result<()> {
    let engine = open_engine(config).await?;
    let view = engine.intents().await;

    println!("Intents ({}):", view.intents.len());
    for intent in &view.intents {
        println!(
            "  {}: {}",
            intent.name,
            intent.training_phrases.join(" | ")
        );
    }

    println!("Discovered ({}):", view.discovered.len());
    for (key, phrases) in &view.discovered {
        println!("  {} [{}]: {}", key, phrases.len(), phrases.join(" | "));
    }
    Ok(())
}

/// Run one promotion sweep.
pub async fn run_promote(config: &Config) -> Result<()> {
    let engine = open_engine(config).await?;
    let promoted = engine.validate().await;

    if promoted.is_empty() {
        println!("No clusters ready for promotion.");
    } else {
        for intent in &promoted {
            println!(
                "Promoted {} ({} phrases)",
                intent.name,
                intent.training_phrases.len()
            );
        }
    }
    Ok(())
}
