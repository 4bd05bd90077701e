use std::time::Duration;

use anyhow::Result;
use openrouter_client::{ChatClient, ChatRequest, Config, Message, OpenRouterClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = OpenRouterClient::from_env()?;

    let request = ChatRequest::new(vec![Message::user("Say hello.")])
        .with_config(Config::new().model("openai/gpt-4o-mini").max_tokens(16));

    let response = client.complete(request, None).await?;
    println!("Response: {}", response.content().unwrap_or_default());

    // Stats are published shortly after the generation finishes
    tokio::time::sleep(Duration::from_secs(2)).await;

    let stats = client.generation_stats(&response.id).await?;
    let data = &stats.data;

    println!("Model: {}", data.model);
    println!("Created at: {}", data.created_at);
    println!(
        "Tokens - Prompt: {}, Completion: {}",
        data.tokens_prompt.unwrap_or(0),
        data.tokens_completion.unwrap_or(0)
    );
    println!("Total cost: ${:.6}", data.total_cost);

    Ok(())
}
