use lambda_http::{run, service_fn, tracing, Error, Request};
use zoom_meetings::{
    api::SignedApiClient, credentials::Credentials, http_handler::function_handler,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    if let Ok(path) = dotenvy::dotenv() {
        tracing::info!("Loaded environment from {:?}", path);
    }
    let credentials = Credentials::from_env()?;
    tracing::info!("Using meeting provider at {:?}", credentials.base_url());

    let client = SignedApiClient::new(credentials);
    let client = &client;
    run(service_fn(move |event: Request| async move {
        function_handler(client, event).await
    }))
    .await
}
