use rust_embed::RustEmbed;

/// Landing page and thank-you page, compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/static"]
pub struct Assets;
