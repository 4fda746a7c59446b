//! Max-brightness command implementation.

use super::session::{Session, SessionOptions};

/// Runs the max-brightness command.
pub fn run(options: &SessionOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(options)?;
    println!("{}", session.settings_mut().maximum_brightness()?);
    Ok(())
}
