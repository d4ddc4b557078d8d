use reqwest::Client;
use serde_json::{json, Value};

async fn show(label: &str, response: reqwest::Response) -> Result<Value, Box<dyn std::error::Error>> {
    println!("\n{}", label);
    println!("Status: {}", response.status());
    let body: Value = response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&body)?);
    Ok(body)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let base_url = std::env::var("TUTOR_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    println!("🎓 Testing tutor session client");

    let response = client
        .put(format!("{}/language", base_url))
        .json(&json!({ "language": "en" }))
        .send()
        .await?;
    show("🌐 Language:", response).await?;

    let response = client
        .put(format!("{}/notes", base_url))
        .json(&json!({
            "notes": "1) Solve 2x + 3 = 11.\n2) A circle has radius 4 cm. Find its area."
        }))
        .send()
        .await?;
    show("📝 Notes:", response).await?;

    let response = client.post(format!("{}/analyze", base_url)).send().await?;
    let session = show("🧠 Analysis:", response).await?;

    if session["status"] != "complete" {
        println!("\nAnalysis did not complete, stopping here.");
        return Ok(());
    }

    let response = client
        .post(format!("{}/questions/0/explain", base_url))
        .send()
        .await?;
    show("🔍 Explain question 1:", response).await?;

    let response = client
        .post(format!("{}/chat", base_url))
        .json(&json!({ "message": "Why do we subtract 3 first?" }))
        .send()
        .await?;
    show("💬 Chat:", response).await?;

    let response = client.post(format!("{}/slides", base_url)).send().await?;
    show("📊 Slides:", response).await?;

    println!("\n✅ Client test completed!");
    Ok(())
}
