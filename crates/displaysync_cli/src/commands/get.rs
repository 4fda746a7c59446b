//! Get command implementation.

use super::session::{resolve, Session, SessionOptions};

/// Runs the get command.
pub fn run(options: &SessionOptions, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = resolve(name)?;
    let session = Session::open(options)?;
    println!("{}", session.settings().engine().get(id));
    Ok(())
}
