use std::env;
use std::fs::File;

use formscookie::{CompatibilityMode, KeyMaterial, Result, Ticket, TicketCodec};

const VALIDATION_KEY: &str = "\
    000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F\
    202122232425262728292A2B2C2D2E2F303132333435363738393A3B3C3D3E3F";
const DECRYPTION_KEY: &str = "404142434445464748494A4B4C4D4E4F505152535455565758595A5B5C5D5E5F";

fn main() -> Result<()> {
    // `cargo run --example cookie -- machine.keys` reads keys from a file.
    let keys = match env::args().nth(1) {
        Some(path) => KeyMaterial::load(File::open(path)?)?,
        None => KeyMaterial::from_hex(VALIDATION_KEY, DECRYPTION_KEY)?,
    };

    for mode in [CompatibilityMode::Modern, CompatibilityMode::LegacyFramework45] {
        let codec = TicketCodec::new(&keys, mode)?.enforce_expiry(false);

        let ticket = Ticket::new("alice").with_user_data("role=admin");
        let cookie = codec.encode(&ticket)?;
        println!("{mode}: {cookie}");

        let decoded = codec.decode(&cookie)?;
        println!(
            "  name={} user_data={:?} path={} expires={}",
            decoded.name, decoded.user_data, decoded.cookie_path, decoded.expiration
        );
    }

    Ok(())
}
