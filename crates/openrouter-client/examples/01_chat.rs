use anyhow::Result;
use openrouter_client::{ChatClient, ChatRequest, Config, Message, OpenRouterClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = OpenRouterClient::from_env()?;

    let request = ChatRequest::new(vec![
        Message::system("Answer in one short sentence."),
        Message::user("What is the capital of France?"),
    ])
    .with_config(Config::new().model("openai/gpt-4o-mini").temperature(0.2));

    let response = client.complete(request, None).await?;

    println!("Response: {}", response.content().unwrap_or_default());

    if let Some(usage) = response.usage {
        println!("Tokens used: {}", usage.total_tokens);
    }
    println!("Generation id: {}", response.id);

    Ok(())
}
