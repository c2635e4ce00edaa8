use std::collections::HashMap;

use space_client::{ConnectionOptions, EvaluationOptions};

#[tokio::main]
pub async fn main() -> space_client::Result<()> {
    // Configure env_logger to see SPACE client logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("space")).init();

    let url = std::env::var("SPACE_URL").unwrap_or_else(|_| "http://localhost:5403".to_owned());
    let api_key =
        std::env::var("SPACE_API_KEY").expect("SPACE_API_KEY env variable should contain API key");

    let client = space_client::connect(ConnectionOptions::new(url, api_key))?;

    if !client.is_connected_to_space().await {
        println!("SPACE is not reachable at {}", client.http_base_url()?);
        return Ok(());
    }

    // Register one more meeting against the user's usage limit.
    let expected_consumption = HashMap::from([("zoom-maxMeetings".to_owned(), 1.0)]);
    let result = client
        .features()
        .evaluate(
            "test-user",
            "zoom-meetings",
            &expected_consumption,
            EvaluationOptions::default().with_details(true),
        )
        .await?;

    if result.is_flag_not_found() {
        println!("Feature is not part of the user's contract");
    } else {
        println!("Evaluation: {:?}", result);
    }

    Ok(())
}
