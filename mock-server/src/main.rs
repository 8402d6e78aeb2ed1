//! Stand-alone mock of the list server's REST API.
//!
//! `BIND` (default `127.0.0.1:9001`) picks the address; `REST_USER` and
//! `REST_PASS` override the accepted Basic credentials.

use std::env;

use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let addr = env::var("BIND").unwrap_or_else(|_| "127.0.0.1:9001".to_string());
    let username = env::var("REST_USER").unwrap_or_else(|_| mock_server::DEFAULT_USERNAME.to_string());
    let password = env::var("REST_PASS").unwrap_or_else(|_| mock_server::DEFAULT_PASSWORD.to_string());

    let listener = TcpListener::bind(&addr).await?;
    println!("REST API mock listening on http://{addr}/3.0 as {username}");
    mock_server::serve(listener, mock_server::app_with_credentials(&username, &password)).await
}
