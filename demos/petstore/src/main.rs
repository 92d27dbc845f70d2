//! Petstore API Example
//!
//! Lists the available pets of a petstore server.

// Example-specific lint allowances
#![allow(clippy::print_stdout)]

use chttp::{BoxError, Context, unmarshal_error_to};
use petstore_example::{ApiResponse, PetStatus, Petstore};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let host = std::env::var("PETSTORE_URL")
        .unwrap_or_else(|_| "https://petstore3.swagger.io/api/v3".to_owned());
    let petstore = Petstore::new(&host, "special-key")?;
    let ctx = Context::background();

    println!("Petstore client for {host}");

    match petstore.pets.find_by_status(&ctx, PetStatus::Available).await {
        Ok(pets) => println!("{} pets available", pets.len()),
        Err(err) => match unmarshal_error_to::<ApiResponse, _>(err) {
            Ok(api) => println!("rejected: {} ({})", api.message, api.code),
            Err(other) => return Err(other),
        },
    }

    Ok(())
}

