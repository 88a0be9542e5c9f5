//! Demo driver: sequences create / read / add-interest calls against the
//! user connector for illustration. Expects a record store REST endpoint at
//! `REST_BASE_URL` (default `http://localhost:8080`).

use asrest_core::RestClient;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use users_demo::{User, UserConnector};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let base_url =
        std::env::var("REST_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let interest = std::env::args().nth(1).unwrap_or_else(|| "aerospike".to_string());

    let connector = UserConnector::new(RestClient::new(&base_url), "test", "users");

    let user1 = User::new(
        "123456",
        "Bob Roberts",
        "Bob@NotAValid.com.email.com",
        &["cooking", "gardening", "sewing"],
    );
    let user2 = User::new(
        "6545321",
        "Alice Allison",
        "Alice@NotAValid.com.email.com",
        &["programming", "gardening", "mathematics"],
    );

    // Already-existing users are fine; this driver is rerunnable.
    connector.create_user(&user1, false)?;
    connector.create_user(&user2, false)?;

    println!("*** The first user retrieved from the database is ***");
    println!("{:?}", connector.get_user(&user1.id)?);

    println!("\n*** The second user retrieved from the database is ***");
    println!("{:?}", connector.get_user(&user2.id)?);

    let new_interests = connector.add_interest(&user1.id, &interest)?;
    println!("\n*** Updated interests are: ***");
    println!("{new_interests:?}");

    println!("\n*** The first user retrieved from the database is ***");
    println!("{:?}", connector.get_user(&user1.id)?);

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
