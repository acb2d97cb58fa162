pub mod document;
pub mod store;

use anyhow::Result;
use colored::*;
use std::path::Path;

pub use document::{Document, SiteColor, SiteMarkers, WifiEntry};
pub use store::{read_document, Store};

/// Print the stored board as pretty JSON. Never creates or repairs the file.
pub fn show(data_file: &Path) -> Result<()> {
    let doc = read_document(data_file)?;

    println!(
        "{} {}",
        "Board".cyan().bold(),
        data_file.display().to_string().bright_black()
    );
    println!("{}", "═".repeat(60).bright_black());
    println!("{}", serde_json::to_string_pretty(&doc)?);

    Ok(())
}

/// Reset the stored board to defaults without a running server
pub fn reset(data_file: &Path) -> Result<()> {
    let store = Store::load(data_file);
    store.reset()?;
    Ok(())
}
