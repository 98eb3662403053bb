use ctmp_harness::scenario;

use crate::cmd::ListArgs;
use crate::exit::{harness_error, CliResult, SUCCESS};
use crate::output::{print_catalogue, OutputFormat};

pub fn run(_args: ListArgs, format: OutputFormat) -> CliResult<i32> {
    let catalogue = scenario::builtin().map_err(|err| harness_error("catalogue", err))?;
    print_catalogue(&catalogue, format);
    Ok(SUCCESS)
}
