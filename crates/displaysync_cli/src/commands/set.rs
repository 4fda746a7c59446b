//! Set command implementation.

use super::session::{resolve, CliError, Session, SessionOptions};
use displaysync_core::SettingValue;

/// Runs the set command.
pub fn run(
    options: &SessionOptions,
    name: &str,
    input: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = resolve(name)?;
    let value = SettingValue::parse(id.descriptor().kind, input)
        .map_err(|reason| CliError::InvalidValue { setting: id, reason })?;

    let mut session = Session::open(options)?;
    let changed = session.settings_mut().engine_mut().set(id, value);
    session.save()?;

    if changed {
        println!("{id} = {value}");
    } else {
        println!("{id} unchanged ({value})");
    }
    Ok(())
}
