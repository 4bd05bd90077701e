use anyhow::Result;
use futures::StreamExt;
use openrouter_client::{
    ChatClient, ChatRequest, Config, Message, OpenRouterClient, StreamNotification,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let default_config = Config::new()
        .fallback_models(["anthropic/claude-3.5-sonnet", "openai/gpt-4o"])?
        .x_title("openrouter-client demo");

    let client = OpenRouterClient::builder()
        .api_key(std::env::var("OPENROUTER_API_KEY")?)
        .default_config(default_config)
        .build()?;

    let request = ChatRequest::new(vec![
        Message::user("Name a prime number."),
        Message::assistant("7"),
        Message::user("Name three more, comma separated."),
    ]);

    let mut stream = client.stream_transcript(request);
    let mut last = None;

    while let Some(notification) = stream.next().await {
        match notification {
            StreamNotification::Data(transcript) => {
                print!("\r{}", transcript.content());
                std::io::Write::flush(&mut std::io::stdout())?;
                last = Some(transcript);
            }
            StreamNotification::End => println!(),
            StreamNotification::Error(e) => return Err(e.into()),
        }
    }

    if let Some(transcript) = last {
        println!("\nModel: {}", transcript.model.as_deref().unwrap_or("unknown"));
        println!("Finish reason: {}", transcript.finish_reason.as_deref().unwrap_or("none"));
        println!("Transcript has {} messages", transcript.messages().len());
    }

    Ok(())
}
