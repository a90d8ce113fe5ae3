extern crate marketplace_auth;

use std::collections::BTreeMap;

use marketplace_auth::config::Credentials;
use marketplace_auth::Method;

static KEY: &str = include_str!("../tests/data/rsa-2048-pkcs8.b64");

fn main() {
    env_logger::builder().filter_level(log::LevelFilter::Debug).init();

    // Pass a credentials file to sign with real credentials.
    let credentials = match std::env::args().nth(1) {
        Some(path) => {
            let toml_str = std::fs::read_to_string(&path).expect("Failed to read credentials file");
            Credentials::from_toml_str(&toml_str).expect("Failed to parse credentials")
        }
        None => Credentials {
            consumer_id: "WM123".to_string(),
            private_key: KEY.into(),
            channel_type: None,
        },
    };

    let mut signer = credentials
        .signer()
        .target("https://marketplace.walmartapis.com/v3/orders", Method::Get);
    signer.sign_data().expect("Failed to sign");

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    signer.apply_headers(&mut headers).expect("Failed to apply headers");
    println!("{:#?}", headers);
}
