use ibkit_core::domain::instruments;

use crate::error::CliError;

use super::{CommandResult, STATIC_SOURCE};

pub fn run() -> Result<CommandResult, CliError> {
    let data = serde_json::to_value(instruments::all())?;
    Ok(CommandResult::ok(data, STATIC_SOURCE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_the_catalog() {
        let result = run().expect("run");
        let items = result.data.as_array().expect("array");
        assert_eq!(items.len(), 8);
        assert_eq!(items[0]["symbol"], "ES");
        assert_eq!(items[0]["contract"], "mini");
    }
}
