use anyhow::Result;
use futures::StreamExt;
use openrouter_client::{
    ChatClient, ChatRequest, Config, Message, OpenRouterClient, ReasoningConfig, StreamNotification,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = OpenRouterClient::from_env()?;

    let request = ChatRequest::new(vec![Message::user(
        "Explain in three sentences how a hash map handles collisions.",
    )])
    .with_config(
        Config::new()
            .model("deepseek/deepseek-r1")
            .reasoning(ReasoningConfig::low()),
    );

    println!("Streaming chunks:\n");

    let mut stream = client.stream_chunks(request);
    let mut reasoning_displayed = false;

    while let Some(notification) = stream.next().await {
        match notification {
            StreamNotification::Data(chunk) => {
                if let Some(reasoning) = chunk.reasoning() {
                    if !reasoning_displayed {
                        println!("[REASONING]");
                        reasoning_displayed = true;
                    }
                    print!("{}", reasoning);
                }
                if let Some(content) = chunk.content().filter(|c| !c.is_empty()) {
                    if reasoning_displayed {
                        println!("\n\n[RESPONSE]");
                        reasoning_displayed = false;
                    }
                    print!("{}", content);
                }
                if let Some(usage) = chunk.usage {
                    println!("\n\nTokens - Prompt: {}, Completion: {}", usage.prompt_tokens, usage.completion_tokens);
                }
                std::io::Write::flush(&mut std::io::stdout())?;
            }
            StreamNotification::End => println!("\nDone."),
            StreamNotification::Error(e) => return Err(e.into()),
        }
    }

    Ok(())
}
