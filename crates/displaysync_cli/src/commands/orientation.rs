//! Orientation command implementation.

use super::session::{Session, SessionOptions};

/// Runs the orientation command.
///
/// With a value the lock is written; every write is stored, even when it
/// repeats the current value.
pub fn run(options: &SessionOptions, value: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(options)?;
    let settings = session.settings();

    if let Some(value) = value {
        if !settings.set_orientation_lock(value) {
            return Err("failed to store orientation lock".into());
        }
    }
    println!("{}", settings.orientation_lock());
    Ok(())
}
