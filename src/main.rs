use std::{env, error::Error, path::Path};

use waczcore::RunBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    let Some(path_argument) = env::args_os().nth(1) else {
        eprintln!("usage: waczcore <warc-file>");
        return Ok(());
    };

    let warc_file_path = Path::new(&path_argument);
    println!("The warc file path is {}", warc_file_path.display());

    let run = RunBuilder::new()
        .add_input(warc_file_path)
        .output("output.wacz")
        .build()?;
    let outcome = run.process()?;

    println!(
        "wrote {} ({} record(s), {} page(s))",
        outcome.output.display(),
        outcome.record_count,
        outcome.page_count
    );
    Ok(())
}
